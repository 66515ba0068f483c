use crate::api::handlers::auth::password;
use anyhow::Result;
use secrecy::{ExposeSecret, SecretString};

/// Hash a password and print the PHC string, for seeding user rows by hand.
/// # Errors
/// Returns an error if hashing fails.
pub fn execute(password: &SecretString, time_cost: u32) -> Result<()> {
    let hash = password::hash_password(password.expose_secret(), time_cost)
        .map_err(|err| anyhow::anyhow!("Failed to hash password: {err}"))?;

    println!("{hash}");

    Ok(())
}
