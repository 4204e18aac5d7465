use std::io::{self, Write};

use booking_desk::admin::password::hash_password;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    eprint!("Enter admin password: ");
    io::stderr().flush()?;

    let mut password = String::new();
    io::stdin().read_line(&mut password)?;
    let password = password.trim_end_matches(['\r', '\n']);

    if password.is_empty() {
        eprintln!("Password cannot be empty");
        std::process::exit(1);
    }

    println!("{}", hash_password(password));
    eprintln!("Set it as ADMIN_PASSWORD_HASH to override the panel-stored password.");
    Ok(())
}
