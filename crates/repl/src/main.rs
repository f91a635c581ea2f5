use std::{
    io::{self, BufRead, Write},
    ops::ControlFlow,
    path::PathBuf,
};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use log::{error, info};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use town_builder::{
    Action, FileStore, KeyValueStore, MemoryStore, Point, TownConfig, WorldStore,
};

mod map;

#[derive(Debug, Parser)]
#[command(version, about = "Edit a town builder world from the terminal")]
struct Args {
    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Directory the world is stored in
    #[arg(short, long, default_value = "town-data")]
    data: PathBuf,
    /// Keep the world in memory and discard it on exit
    #[arg(long, conflicts_with = "data")]
    ephemeral: bool,
    /// Overrides the configured seed
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Debug, Parser)]
#[command(no_binary_name = true, disable_version_flag = true)]
struct Line {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the map
    #[command(alias = "ls")]
    Show,
    /// Describe one tile
    Tile { x: isize, y: isize },
    /// Select a tile
    Select { x: isize, y: isize },
    Deselect,
    /// Click a tile, toggling its selection in interactive mode
    Click { x: isize, y: isize },
    /// Turn interactive mode on or off
    Interactive { state: Toggle },
    /// Apply an action at a tile, or at the selection if no tile is given
    Act {
        action: Action,
        #[arg(requires = "y")]
        x: Option<isize>,
        y: Option<isize>,
    },
    /// List the actions
    Actions,
    /// Print what a renderer would draw at a tile
    Render { x: isize, y: isize },
    Save,
    #[command(alias = "exit")]
    Quit,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Toggle {
    On,
    Off,
}

fn run<S, R>(store: &mut WorldStore<S, R>, command: Command) -> anyhow::Result<ControlFlow<()>>
where
    S: KeyValueStore,
    R: rand::Rng,
{
    match command {
        Command::Show => print!("{}", map::draw(store.world(), store.selected())),
        Command::Tile { x, y } => println!("{}", map::describe(store.world(), Point::new(x, y))?),
        Command::Select { x, y } => store.select_at(Point::new(x, y))?,
        Command::Deselect => store.clear_selection()?,
        Command::Click { x, y } => {
            if !store.click(Point::new(x, y))? {
                println!("Not in interactive mode");
            }
        }
        Command::Interactive { state } => store.set_interactive(matches!(state, Toggle::On)),
        Command::Act { action, x, y } => {
            let report = match (x, y) {
                (Some(x), Some(y)) => store.dispatch(action, Point::new(x, y))?,
                (None, None) => store.dispatch_selected(action)?,
                _ => bail!("Give both coordinates or neither"),
            };
            if report.is_noop() {
                println!("Nothing changed");
            }
            print!("{}", map::draw(store.world(), store.selected()));
        }
        Command::Actions => {
            for action in enum_iterator::all::<Action>() {
                println!("{action}");
            }
        }
        Command::Render { x, y } => {
            let cell = Point::new(x, y);
            for item in store.render_items().into_iter().filter(|item| item.cell == cell) {
                let [px, py, pz] = item.world_position;
                println!(
                    "{} at ({px}, {py}, {pz}), yaw {:.3}{}",
                    item.model,
                    item.rotation.radians(),
                    if item.selected { ", selected" } else { "" }
                );
            }
        }
        Command::Save => store.save()?,
        Command::Quit => return Ok(ControlFlow::Break(())),
    }
    Ok(ControlFlow::Continue(()))
}

fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => TownConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => TownConfig::default(),
    };
    if args.seed.is_some() {
        config.world.seed = args.seed;
    }
    let rng = match config.world.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };

    let mut backend: Box<dyn KeyValueStore> = if args.ephemeral {
        Box::new(MemoryStore::new())
    } else {
        Box::new(FileStore::open(&args.data).context("Failed to open data directory")?)
    };
    let mut store =
        WorldStore::load_or_init(&mut *backend, &config, rng).context("Failed to open world")?;
    store.subscribe(|report| {
        info!(
            "{} at {}: {} tiles changed, {} roads updated",
            report.action,
            report.target,
            report.changed.len(),
            report.resolved_roads.len()
        )
    });

    print!("{}", map::draw(store.world(), store.selected()));
    let mut lines = io::stdin().lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next().transpose()? else { break };

        let Some(words) = shlex::split(&line) else {
            error!("Unbalanced quotes");
            continue;
        };
        if words.is_empty() {
            continue;
        }
        let command = match Line::try_parse_from(words) {
            Ok(line) => line.command,
            Err(e) => {
                e.print()?;
                continue;
            }
        };
        match run(&mut store, command) {
            Ok(ControlFlow::Break(())) => break,
            Ok(ControlFlow::Continue(())) => {}
            Err(e) => error!("{e:#}"),
        }
    }
    Ok(())
}
