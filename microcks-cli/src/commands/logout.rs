//! `logout` clears the tokens of the user referenced by a context. The
//! context itself is kept so a later `login` can reuse it.

use clap::Args;
use microcks_shared::config::{self, LocalConfig};
use microcks_shared::{MicrocksError, Result};

#[derive(Args, Debug)]
pub struct LogoutArgs {
    /// Context to log out from
    pub context: String,
}

pub fn execute(args: LogoutArgs) -> Result<()> {
    let config_path = config::default_config_path()?;
    let mut local = LocalConfig::read(&config_path)?
        .ok_or_else(|| MicrocksError::NotFound("nothing to logout from".into()))?;

    // Contexts may carry a custom name, the tokens hang off the user record.
    let user = local.get_context(&args.context)?.user.clone();
    if !local.clear_user_tokens(&user) {
        return Err(MicrocksError::NotFound(format!("user '{user}' undefined")));
    }

    local.write(&config_path)?;
    println!("Logged out from '{}'", args.context);
    Ok(())
}
