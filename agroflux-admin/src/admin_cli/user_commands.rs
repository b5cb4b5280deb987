use agroflux_api::models::NewUser;
use agroflux_api::orm::login::hash_password;
use agroflux_api::orm::user::{
    delete_user, get_user, get_user_by_login, insert_user, list_all_users, update_password_hash,
    update_user,
};
use agronomy::account::{MIN_PASSWORD_LEN, validate_email, validate_profile};
use clap::Subcommand;
use diesel::sqlite::SqliteConnection;
use rpassword::read_password;
use std::io::{self, Write};

use super::utils::{Matcher, confirm};

#[derive(Subcommand)]
pub enum UserAction {
    #[command(about = "Add a new user")]
    Add {
        #[arg(short, long, help = "Login id used on the sign-in form")]
        login: String,
        #[arg(short, long, help = "Full name")]
        name: String,
        #[arg(short, long, help = "Email address")]
        email: String,
        #[arg(long, help = "Phone number (optional)")]
        phone: Option<String>,
        #[arg(short, long, help = "Password (will be prompted securely if not provided)")]
        password: Option<String>,
    },
    #[command(about = "Change user password")]
    ChangePassword {
        #[arg(short, long, help = "Login id")]
        login: String,
        #[arg(short, long, help = "New password (will be prompted securely if not provided)")]
        password: Option<String>,
    },
    #[command(about = "List users, optionally filtered by search term")]
    Ls {
        #[arg(help = "Search term matched against login, name and email (regex by default, use -F for fixed string)")]
        search_term: Option<String>,
        #[arg(short = 'F', long = "fixed-string", help = "Treat search term as fixed string instead of regex")]
        fixed_string: bool,
    },
    #[command(about = "Remove users matching search term")]
    Rm {
        #[arg(help = "Search term to match users for removal (regex by default, use -F for fixed string)")]
        search_term: String,
        #[arg(short = 'F', long = "fixed-string", help = "Treat search term as fixed string instead of regex")]
        fixed_string: bool,
        #[arg(short = 'y', long = "yes", help = "Skip confirmation prompt")]
        yes: bool,
    },
    #[command(about = "Edit user fields")]
    Edit {
        #[arg(short, long, help = "User ID to edit")]
        id: i32,
        #[arg(long, help = "New full name")]
        name: Option<String>,
        #[arg(long, help = "New email address")]
        email: Option<String>,
        #[arg(long, help = "New phone number")]
        phone: Option<String>,
    },
}

pub fn handle_user_command_with_conn(
    conn: &mut SqliteConnection,
    action: UserAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        UserAction::Add { login, name, email, phone, password } => {
            add_user_impl(conn, &login, &name, &email, phone, password)?;
        }
        UserAction::ChangePassword { login, password } => {
            change_password_impl(conn, &login, password)?;
        }
        UserAction::Ls { search_term, fixed_string } => {
            list_users_impl(conn, search_term, fixed_string)?;
        }
        UserAction::Rm { search_term, fixed_string, yes } => {
            remove_users_impl(conn, &search_term, fixed_string, yes)?;
        }
        UserAction::Edit { id, name, email, phone } => {
            user_edit_impl(conn, id, name, email, phone)?;
        }
    }
    Ok(())
}

pub fn add_user_impl(
    conn: &mut SqliteConnection,
    login: &str,
    name: &str,
    email: &str,
    phone: Option<String>,
    password: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let login = login.trim();
    if login.is_empty() {
        return Err("Login id cannot be empty".into());
    }
    validate_profile(name, email)?;
    if get_user_by_login(conn, login)?.is_some() {
        return Err(format!("User '{}' already exists", login).into());
    }

    let password = match password {
        Some(p) => p,
        None => prompt_for_password()?,
    };
    check_password(&password)?;
    let password_hash =
        hash_password(&password).map_err(|e| format!("Failed to hash password: {}", e))?;

    let created_user = insert_user(
        conn,
        NewUser {
            login_id: login.to_string(),
            full_name: name.trim().to_string(),
            email: email.trim().to_string(),
            phone: phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
            password_hash,
        },
    )?;

    println!("User created successfully!");
    println!("ID: {}", created_user.id);
    println!("Login: {}", created_user.login_id);
    println!("Name: {}", created_user.full_name);
    println!("Email: {}", created_user.email);

    Ok(())
}

pub fn change_password_impl(
    conn: &mut SqliteConnection,
    login: &str,
    password: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let user = get_user_by_login(conn, login)?
        .ok_or_else(|| format!("User '{}' not found", login))?;

    let password = match password {
        Some(p) => p,
        None => prompt_for_password()?,
    };
    check_password(&password)?;
    let password_hash =
        hash_password(&password).map_err(|e| format!("Failed to hash password: {}", e))?;
    update_password_hash(conn, user.id, &password_hash)?;

    println!("Password changed successfully for user: {}", login);
    Ok(())
}

pub fn list_users_impl(
    conn: &mut SqliteConnection,
    search_term: Option<String>,
    fixed_string: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let users = list_all_users(conn)?;

    let filtered_users = match search_term {
        Some(term) => {
            let matcher = Matcher::new(&term, fixed_string)?;
            users
                .into_iter()
                .filter(|u| matcher.matches(&[&u.login_id, &u.full_name, &u.email]))
                .collect::<Vec<_>>()
        }
        None => users,
    };

    if filtered_users.is_empty() {
        println!("No users found.");
    } else {
        println!("Users:");
        for user in filtered_users {
            println!(
                "  ID: {}, Login: {}, Name: {}, Email: {}, Phone: {}",
                user.id,
                user.login_id,
                user.full_name,
                user.email,
                user.phone.as_deref().unwrap_or("-")
            );
        }
    }

    Ok(())
}

pub fn remove_users_impl(
    conn: &mut SqliteConnection,
    search_term: &str,
    fixed_string: bool,
    yes: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let matcher = Matcher::new(search_term, fixed_string)?;
    let matching_users = list_all_users(conn)?
        .into_iter()
        .filter(|u| matcher.matches(&[&u.login_id, &u.full_name, &u.email]))
        .collect::<Vec<_>>();

    if matching_users.is_empty() {
        println!("No users found matching the search term.");
        return Ok(());
    }

    println!("Found {} user(s) matching the search term:", matching_users.len());
    for user in &matching_users {
        println!("  ID: {}, Login: {}, Email: {}", user.id, user.login_id, user.email);
    }

    if !yes
        && !confirm(&format!(
            "Are you sure you want to delete these {} user(s)?",
            matching_users.len()
        ))?
    {
        println!("Operation cancelled.");
        return Ok(());
    }

    let mut deleted_count = 0;
    let mut errors = Vec::new();

    for user in matching_users {
        match delete_user(conn, user.id) {
            Ok(rows_affected) => {
                if rows_affected > 0 {
                    deleted_count += 1;
                    println!("Deleted user: {} (ID: {})", user.login_id, user.id);
                }
            }
            Err(e) => {
                errors.push(format!(
                    "Failed to delete user {} (ID: {}): {}",
                    user.login_id, user.id, e
                ));
            }
        }
    }

    println!("Successfully deleted {} user(s).", deleted_count);

    if !errors.is_empty() {
        println!("Errors encountered:");
        for error in errors {
            println!("  {}", error);
        }
        return Err("Some deletions failed".into());
    }

    Ok(())
}

pub fn user_edit_impl(
    conn: &mut SqliteConnection,
    user_id: i32,
    new_name: Option<String>,
    new_email: Option<String>,
    new_phone: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let user = get_user(conn, user_id)?
        .ok_or_else(|| format!("User with ID {} does not exist", user_id))?;

    if new_name.is_none() && new_email.is_none() && new_phone.is_none() {
        println!("No fields specified for update. Use --name, --email, or --phone.");
        return Ok(());
    }

    let new_name = new_name.map(|n| n.trim().to_string());
    let new_email = new_email.map(|e| e.trim().to_string());
    if let Some(name) = &new_name {
        if name.is_empty() {
            return Err("Name cannot be empty".into());
        }
    }
    if let Some(email) = &new_email {
        validate_email(email)?;
    }

    let updated_user = update_user(conn, user.id, new_name, new_email, new_phone)?;

    println!("User updated successfully!");
    println!("ID: {}", updated_user.id);
    println!("Login: {}", updated_user.login_id);
    println!("Name: {}", updated_user.full_name);
    println!("Email: {}", updated_user.email);
    println!("Phone: {}", updated_user.phone.as_deref().unwrap_or("-"));

    Ok(())
}

fn check_password(password: &str) -> Result<(), Box<dyn std::error::Error>> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!("Password must be at least {} characters", MIN_PASSWORD_LEN).into());
    }
    Ok(())
}

pub fn prompt_for_password() -> Result<String, Box<dyn std::error::Error>> {
    print!("Enter new password: ");
    io::stdout().flush()?;
    let password = read_password()?;

    if password.is_empty() {
        return Err("Password cannot be empty".into());
    }

    print!("Confirm new password: ");
    io::stdout().flush()?;
    let confirm_password = read_password()?;

    if password != confirm_password {
        return Err("Passwords do not match".into());
    }

    Ok(password)
}
