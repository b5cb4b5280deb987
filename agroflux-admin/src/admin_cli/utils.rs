use agroflux_api::orm::{run_pending_migrations, set_foreign_keys};
use diesel::{prelude::*, sqlite::SqliteConnection};
use dotenvy::dotenv;
use regex::Regex;
use std::io::{self, Write};

/// Opens the database named by `DATABASE_URL`, with foreign keys on and the
/// schema brought up to date.
pub fn establish_connection() -> Result<SqliteConnection, Box<dyn std::error::Error>> {
    dotenv().ok();
    let database_url =
        std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?;
    let mut conn = SqliteConnection::establish(&database_url)?;
    set_foreign_keys(&mut conn)?;
    run_pending_migrations(&mut conn).map_err(|e| format!("Migrations failed: {}", e))?;
    Ok(conn)
}

/// Search term given to `ls` and `rm`: a regex unless `-F` asked for a
/// plain substring.
pub enum Matcher {
    Fixed(String),
    Pattern(Regex),
}

impl Matcher {
    pub fn new(term: &str, fixed_string: bool) -> Result<Self, Box<dyn std::error::Error>> {
        if fixed_string {
            Ok(Matcher::Fixed(term.to_string()))
        } else {
            let regex = Regex::new(term)
                .map_err(|e| format!("Invalid regex pattern '{}': {}", term, e))?;
            Ok(Matcher::Pattern(regex))
        }
    }

    /// True when any of `fields` matches.
    pub fn matches(&self, fields: &[&str]) -> bool {
        fields.iter().any(|field| match self {
            Matcher::Fixed(term) => field.contains(term.as_str()),
            Matcher::Pattern(regex) => regex.is_match(field),
        })
    }
}

/// Asks a yes/no question on stdin. Anything other than `y`/`yes` is no.
pub fn confirm(question: &str) -> Result<bool, Box<dyn std::error::Error>> {
    print!("{} [y/N]: ", question);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim().to_lowercase();
    Ok(input == "y" || input == "yes")
}
