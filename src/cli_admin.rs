use anyhow::{anyhow, bail, Context, Result};
use clap::builder::styling::{AnsiColor, Color, Style};
use clap::builder::Styles;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod sqlite_persistence;

mod user;
use user::{SqliteUserStore, UserManager, UserRole};

fn get_styles() -> Styles {
    clap::builder::Styles::styled()
        .usage(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Cyan))),
        )
        .header(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Cyan))),
        )
        .literal(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
        )
        .invalid(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        )
        .error(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        )
        .valid(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
        )
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack))))
}

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(styles=get_styles())]
struct CliArgs {
    /// Path to the SQLite user database.
    #[clap(value_parser = parse_path)]
    pub user_db: PathBuf,

    #[command(subcommand)]
    command: AdminCommand,
}

#[derive(Subcommand, Debug)]
enum AdminCommand {
    /// Creates a user with the given handle.
    AddUser { user_handle: String },

    /// Creates a password authentication for the given user.
    /// Fails if the user already has a password set.
    AddLogin {
        user_handle: String,
        password: String,
    },

    /// Change the password of a user, fails if no password was set.
    UpdateLogin {
        user_handle: String,
        password: String,
    },

    /// Deletes the password authentication for a given user.
    DeleteLogin { user_handle: String },

    /// Shows authentication information of a given user.
    Show { user_handle: String },

    /// Verifies the password of a given user, it doesn't make any
    /// persistent change, nor it creates any token, it just
    /// compares the password hash.
    CheckPassword {
        user_handle: String,
        password: String,
    },

    /// Shows all user handles.
    UserHandles,

    /// Shows all available roles and their permissions.
    ListRoles,

    /// Adds a role to a user.
    AddRole { user_handle: String, role: String },

    /// Removes a role from a user.
    RemoveRole { user_handle: String, role: String },

    /// Deletes auth tokens that were not used for the given number of days.
    PruneTokens { unused_for_days: u64 },
}

fn resolve_role(role: &str) -> Result<UserRole> {
    UserRole::from_str(role).ok_or_else(|| {
        anyhow!(
            "Invalid role '{}'. Valid roles are: Admin, Label, Regular",
            role
        )
    })
}

fn resolve_user_id(user_manager: &UserManager, user_handle: &str) -> Result<usize> {
    Ok(user_manager
        .get_user_credentials(user_handle)?
        .with_context(|| format!("User '{}' not found", user_handle))?
        .user_id)
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();
    let user_store = SqliteUserStore::new(&cli_args.user_db)?;
    let mut user_manager = UserManager::new(Box::new(user_store));

    match cli_args.command {
        AdminCommand::AddUser { user_handle } => {
            let user_id = user_manager.add_user(&user_handle)?;
            println!("Created user '{}' with id {}", user_handle, user_id);
        }
        AdminCommand::AddLogin {
            user_handle,
            password,
        } => {
            user_manager.create_password_credentials(&user_handle, password)?;
            println!("Password set for '{}'", user_handle);
        }
        AdminCommand::UpdateLogin {
            user_handle,
            password,
        } => {
            user_manager.update_password_credentials(&user_handle, password)?;
            println!("Password updated for '{}'", user_handle);
        }
        AdminCommand::DeleteLogin { user_handle } => {
            user_manager.delete_password_credentials(&user_handle)?;
            println!("Password deleted for '{}'", user_handle);
        }
        AdminCommand::Show { user_handle } => {
            let user_credentials = user_manager.get_user_credentials(&user_handle)?;
            let user_tokens = user_manager.get_user_tokens(&user_handle)?;

            println!("User Credentials:");
            println!("{:#?}", user_credentials);

            println!("\nAuth Tokens:");
            for token in user_tokens.iter() {
                println!("{:#?}", token);
            }

            if let Some(creds) = user_credentials {
                let roles = user_manager.get_user_roles(creds.user_id)?;
                println!("\nRoles:");
                if roles.is_empty() {
                    println!("  (no roles assigned)");
                } else {
                    for role in roles.iter() {
                        println!("  - {}", role.as_str());
                    }
                }

                let permissions = user_manager.get_user_permissions(creds.user_id)?;
                println!("\nResolved Permissions:");
                if permissions.is_empty() {
                    println!("  (no permissions)");
                } else {
                    for permission in permissions.iter() {
                        println!("  - {:?}", permission);
                    }
                }
            }
        }
        AdminCommand::CheckPassword {
            user_handle,
            password,
        } => {
            let user_credentials = user_manager
                .get_user_credentials(&user_handle)?
                .with_context(|| format!("User '{}' not found", user_handle))?;
            let password_credentials = match user_credentials.username_password {
                Some(x) => x,
                None => bail!("User '{}' has no password set", user_handle),
            };
            let msg = match password_credentials.hasher.verify(
                password,
                password_credentials.hash,
                password_credentials.salt,
            ) {
                Ok(true) => "The password provided is correct!".to_string(),
                Ok(false) => "Wrong password.".to_string(),
                Err(err) => format!(
                    "Could not verify the password, something went wrong: {}",
                    err
                ),
            };
            println!("{}", msg);
        }
        AdminCommand::UserHandles => {
            println!("{:#?}", user_manager.get_all_user_handles()?);
        }
        AdminCommand::ListRoles => {
            println!("Available Roles:\n");
            for role in &[UserRole::Admin, UserRole::Label, UserRole::Regular] {
                println!("Role: {}", role.as_str());
                println!("Permissions:");
                for permission in role.permissions() {
                    println!("  - {:?}", permission);
                }
                println!();
            }
        }
        AdminCommand::AddRole { user_handle, role } => {
            let role = resolve_role(&role)?;
            let user_id = resolve_user_id(&user_manager, &user_handle)?;
            user_manager.add_user_role(user_id, role)?;
            println!("Role '{}' added to user '{}'", role.as_str(), user_handle);
        }
        AdminCommand::RemoveRole { user_handle, role } => {
            let role = resolve_role(&role)?;
            let user_id = resolve_user_id(&user_manager, &user_handle)?;
            user_manager.remove_user_role(user_id, role)?;
            println!("Role '{}' removed from user '{}'", role.as_str(), user_handle);
        }
        AdminCommand::PruneTokens { unused_for_days } => {
            let pruned = user_manager.prune_unused_tokens(unused_for_days)?;
            println!("Pruned {} unused auth tokens", pruned);
        }
    }
    Ok(())
}
