use clap::Subcommand;
use pomofocus_core::storage::Database;
use pomofocus_core::{IdentityProvider, StoredIdentity, UserRef};

use super::{set_selected_task, CliResult};

#[derive(Subcommand)]
pub enum AuthAction {
    /// Sign in as a user
    Login {
        /// User identifier
        user: String,
    },
    /// Sign out
    Logout,
    /// Print the signed-in user
    Whoami,
}

pub fn run(action: AuthAction) -> CliResult {
    let db = Database::open()?;
    let identity = StoredIdentity::new(&db);

    match action {
        AuthAction::Login { user } => {
            let user = UserRef::new(user).ok_or("user must not be empty")?;
            if identity.current_identity().as_ref() != Some(&user) {
                set_selected_task(&db, None)?;
            }
            identity.login(&user)?;
            println!("Signed in as {user}");
        }
        AuthAction::Logout => match identity.logout()? {
            Some(user) => {
                set_selected_task(&db, None)?;
                println!("Signed out {user}");
            }
            None => println!("Not signed in"),
        },
        AuthAction::Whoami => match identity.current_identity() {
            Some(user) => println!("{user}"),
            None => {
                eprintln!("not signed in");
                std::process::exit(1);
            }
        },
    }
    Ok(())
}
