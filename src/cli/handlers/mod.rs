mod new_plan;
pub use new_plan::cmd_new;

use std::error::Error;
use std::path::{Path, PathBuf};

use crate::app::App;
use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::settings_io::{self, read_settings_from};
use crate::model::card::{CardId, CardKind};
use crate::model::geometry::grid_to_world;
use crate::model::project::Project;
use crate::ops::{board_ops, project_ops};

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> Result<(), Box<dyn Error>> {
    let json = cli.json;
    let settings_path = cli.settings.unwrap_or_else(settings_io::settings_path);

    match cli.command {
        Commands::New(args) => cmd_new(args, &settings_path),

        // Read commands
        Commands::Show(args) => cmd_show(args, &settings_path, json),
        Commands::Boards(args) => cmd_boards(args, &settings_path, json),
        Commands::Recent => cmd_recent(&settings_path, json),

        // Write commands
        Commands::Add(args) => cmd_add(args, &settings_path),
        Commands::Check(args) => cmd_check(args, &settings_path),
        Commands::Rm(args) => cmd_rm(args, &settings_path),
        Commands::Mv(args) => cmd_mv(args, &settings_path),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Open a plan and run the post-load pass so numbering and neighbours are
/// current.
fn open_plan(settings_path: &Path, plan: &Path) -> Result<App, Box<dyn Error>> {
    let mut app = App::new(settings_path.to_path_buf());
    app.open(plan)?;
    project_ops::finish_load(&mut app.project);
    Ok(app)
}

/// Board index a command applies to: `requested`, or the plan's active board.
fn board_arg(project: &Project, requested: Option<usize>) -> Result<usize, Box<dyn Error>> {
    match requested {
        None => Ok(project.board_index()),
        Some(i) if i < project.board_count() => Ok(i),
        Some(i) => Err(format!(
            "board {} does not exist (the plan has {})",
            i,
            project.board_count()
        )
        .into()),
    }
}

/// Run `edit` with `board` active, then put the plan's own active board
/// back so the command does not change which board the plan opens on.
fn on_board<T>(
    project: &mut Project,
    board: usize,
    edit: impl FnOnce(&mut Project) -> T,
) -> T {
    let active = project.board_index();
    project.set_board_index(board);
    let result = edit(project);
    project.set_board_index(active);
    result
}

/// Board holding card `id`.
fn locate(project: &Project, id: u32) -> Result<usize, Box<dyn Error>> {
    project
        .find_card(CardId(id))
        .map(|(board, _)| board)
        .ok_or_else(|| format!("card not found: {}", id).into())
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_show(args: ShowArgs, settings_path: &Path, json: bool) -> Result<(), Box<dyn Error>> {
    let app = open_plan(settings_path, &args.plan)?;
    let project = &app.project;
    let boards: Vec<usize> = match args.board {
        Some(_) => vec![board_arg(project, args.board)?],
        None => (0..project.board_count()).collect(),
    };

    if json {
        let mut cards = Vec::new();
        for &i in &boards {
            if let Some(board) = project.board(i) {
                cards.extend(
                    reading_order(board)
                        .into_iter()
                        .map(|c| card_to_json(c, i, project.grid_size)),
                );
            }
        }
        println!("{}", serde_json::to_string_pretty(&cards)?);
        return Ok(());
    }

    let mut first = true;
    for &i in &boards {
        let Some(board) = project.board(i) else {
            continue;
        };
        if !first {
            println!();
        }
        first = false;
        println!("== {} ==", board.name);
        let lines = format_board_cards(board);
        if lines.is_empty() {
            println!("(empty)");
        }
        for line in lines {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_boards(args: PlanArg, settings_path: &Path, json: bool) -> Result<(), Box<dyn Error>> {
    let app = open_plan(settings_path, &args.plan)?;
    let project = &app.project;
    let active = project.board_index();

    if json {
        let boards: Vec<BoardJson> = project
            .boards()
            .iter()
            .enumerate()
            .map(|(i, b)| board_to_json(i, b, i == active))
            .collect();
        println!("{}", serde_json::to_string_pretty(&boards)?);
    } else {
        for (i, board) in project.boards().iter().enumerate() {
            println!("{}", format_board_line(i, board, i == active));
        }
    }
    Ok(())
}

fn cmd_recent(settings_path: &Path, json: bool) -> Result<(), Box<dyn Error>> {
    let settings = read_settings_from(settings_path);

    if json {
        let entries: Vec<RecentJson> = settings
            .recent_plans
            .iter()
            .map(|p| RecentJson {
                path: p.clone(),
                exists: Path::new(p).exists(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else if settings.recent_plans.is_empty() {
        println!("No recent plans.");
    } else {
        for p in &settings.recent_plans {
            println!("{}", p);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

fn cmd_add(args: AddArgs, settings_path: &Path) -> Result<(), Box<dyn Error>> {
    let kind = CardKind::parse_kind(&args.kind)
        .ok_or_else(|| format!("unknown card kind: {}", args.kind))?;
    let mut app = open_plan(settings_path, &args.plan)?;
    let board = board_arg(&app.project, args.board)?;

    let id = on_board(&mut app.project, board, |project| {
        let id = match args.at.as_deref() {
            Some([col, row]) => {
                let grid = project.grid_size;
                let corner = grid_to_world((*col, *row), grid);
                let center = corner.add(kind.default_size(grid).scale(0.5));
                board_ops::create_card_at(project, kind, center)
            }
            _ => board_ops::create_card(project, kind),
        };
        match (kind, args.text.as_deref()) {
            (_, None) => Ok(id),
            (CardKind::Image | CardKind::Sound, Some(path)) => {
                board_ops::set_card_path(project, id, path).map(|_| id)
            }
            (_, Some(text)) => board_ops::set_card_text(project, id, text).map(|_| id),
        }
    })?;

    app.save()?;
    println!("{}", id);
    Ok(())
}

fn cmd_check(args: CheckArgs, settings_path: &Path) -> Result<(), Box<dyn Error>> {
    let mut app = open_plan(settings_path, &args.plan)?;
    let board = locate(&app.project, args.id)?;
    on_board(&mut app.project, board, |project| {
        board_ops::set_completion(project, CardId(args.id), !args.undo)
    })?;
    app.save()?;
    Ok(())
}

fn cmd_rm(args: RmArgs, settings_path: &Path) -> Result<(), Box<dyn Error>> {
    let mut app = open_plan(settings_path, &args.plan)?;
    let mut by_board: Vec<(usize, Vec<CardId>)> = Vec::new();
    for &id in &args.ids {
        let board = locate(&app.project, id)?;
        match by_board.iter_mut().find(|(b, _)| *b == board) {
            Some((_, ids)) => ids.push(CardId(id)),
            None => by_board.push((board, vec![CardId(id)])),
        }
    }

    let mut removed = 0;
    for (board, ids) in by_board {
        removed += on_board(&mut app.project, board, |project| {
            board_ops::delete_cards(project, &ids)
        });
    }

    app.save()?;
    println!("Deleted {} card(s)", removed);
    Ok(())
}

fn cmd_mv(args: MvArgs, settings_path: &Path) -> Result<(), Box<dyn Error>> {
    let mut app = open_plan(settings_path, &args.plan)?;
    let board = locate(&app.project, args.id)?;
    let grid = app.project.grid_size;
    let target = grid_to_world((args.col, args.row), grid);

    on_board(&mut app.project, board, |project| {
        let id = CardId(args.id);
        let from = project
            .current_board()
            .card(id)
            .map(|c| c.position())
            .unwrap_or(target);
        board_ops::move_cards(project, &[id], target.sub(from));
    });

    app.save()?;
    Ok(())
}

/// Plan path as the user should see it.
fn display_path(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
