use std::{io, process::ExitCode};

use clap::Parser;

use db_console::{
    cli::Args,
    console::{
        interrupt::spawn_watcher,
        output::open_append,
        repl::Repl,
        session::Session,
        state::SessionState,
    },
    core::{
        backend::Backend,
        sqlite::{OpenOptions, SqliteBackend},
    },
    error::AppResult,
    logging,
};

fn main() -> ExitCode {
    let args = Args::parse();
    let log = logging::init(&args.log_level, args.debug);

    match run(args, log) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(code = e.code(), "{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args, log: logging::LogControl) -> AppResult<()> {
    if let Some(p) = &args.export_path {
        open_append(p)?;
    }
    let opts = OpenOptions {
        read_only: args.read_only,
        create: args.create,
        busy_timeout_ms: args.busy_timeout_ms,
    };
    let mut backend = SqliteBackend::open(&args.database, &opts)?;
    tracing::info!(db = %backend.db_path.display(), "connected");
    if args.no_autocommit {
        backend.set_autocommit(false)?;
    }
    let interrupt = backend.interrupt_handle();

    let session = Session::new(Box::new(backend), SessionState::from_args(&args), log)?;
    spawn_watcher(session.cancel_flag(), move || interrupt.interrupt());

    match &args.command {
        Some(line) => {
            let mut session = session;
            let mut out = io::stdout().lock();
            let outcome = session.handle_line(line, &mut out);
            drop(out);
            session.close();
            outcome.map(|_| ())
        }
        None => Repl::new(session)?.run(),
    }
}
