//! Section catalog commands.

use shopi_section_app::sections::{self, CATALOG};

use super::CommandError;

/// Print the catalog.
pub fn list() {
    #[allow(clippy::print_stdout)]
    {
        for section in CATALOG {
            println!("{}\t{}\t{}", section.id, section.name, section.description);
        }
    }
}

/// Print the Liquid a section installs as, presets included.
///
/// # Errors
///
/// Returns an error if no section has that id.
pub fn show(id: &str) -> Result<(), CommandError> {
    let section =
        sections::lookup(id).ok_or_else(|| CommandError::UnknownSection(id.to_owned()))?;

    #[allow(clippy::print_stdout)]
    {
        println!("{}", section.liquid_with_presets());
    }
    Ok(())
}
