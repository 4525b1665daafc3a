use clap::Subcommand;

use super::config::ConfigArgs;
use super::serve::ServeArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Serve the recipe API and the front end
    Serve(ServeArgs),

    /// Manage recettes configuration
    Config(ConfigArgs),
}
