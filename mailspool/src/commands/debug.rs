use std::io::Write;

use crate::{MailerRegistry, report};

/// List the configured mailers, or only `name`
///
/// # Errors
/// If `name` is not a configured mailer or `out` cannot be written
pub fn debug(
    registry: &MailerRegistry,
    name: Option<&str>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let table = match name {
        Some(name) => report::mailers([registry.info(name)?]),
        None => report::mailers(registry.infos()),
    };

    out.write_all(table.as_bytes())?;
    Ok(())
}
