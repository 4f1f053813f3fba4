//! Registers the Serenity module and checks calculator energies.

use color_eyre::eyre::Result;
use serenity_wrapper::app::CheckApplication;

fn main() -> Result<()> {
    color_eyre::install()?;
    CheckApplication::from_cli()?.run()
}
