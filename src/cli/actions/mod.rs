pub mod hash_password;
pub mod server;

// Internal "interpreter" for `Action`.
mod run;

use secrecy::SecretString;

#[derive(Debug)]
pub enum Action {
    Server(server::Args),
    HashPassword {
        password: SecretString,
        time_cost: u32,
    },
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}
