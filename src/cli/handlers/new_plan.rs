use std::error::Error;
use std::path::Path;

use crate::app::App;
use crate::cli::commands::NewArgs;
use crate::model::board::Board;

pub fn cmd_new(args: NewArgs, settings_path: &Path) -> Result<(), Box<dyn Error>> {
    if args.plan.exists() && !args.force {
        return Err(format!(
            "{} already exists (use --force to overwrite)",
            args.plan.display()
        )
        .into());
    }

    let names: Vec<String> = args
        .boards
        .iter()
        .map(|n| n.trim().to_string())
        .collect();
    if names.iter().any(String::is_empty) {
        return Err("board names cannot be empty".into());
    }

    let mut app = App::new(settings_path.to_path_buf());
    if !names.is_empty() {
        app.project.boards = names.into_iter().map(Board::new).collect();
    }
    let path = app.save_as(&args.plan)?;

    println!("Created {}", super::display_path(&path).display());
    Ok(())
}
