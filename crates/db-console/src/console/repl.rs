use std::{io, path::PathBuf};

use rustyline::{error::ReadlineError, history::DefaultHistory, Editor};

use crate::console::{
    completion::SqlHelper,
    history::{history_path, history_words},
    session::{LineOutcome, Session},
};
use crate::error::AppResult;

const PROMPT: &str = "db> ";

pub struct Repl {
    session: Session,
    editor: Editor<SqlHelper, DefaultHistory>,
    history: Option<PathBuf>,
}

impl Repl {
    pub fn new(mut session: Session) -> AppResult<Self> {
        let history = history_path();
        let mut words = session.completion_words();
        if let Some(h) = &history {
            words.extend(history_words(h));
        }

        let mut editor = Editor::<SqlHelper, DefaultHistory>::new()?;
        editor.set_helper(Some(SqlHelper::new(words)));
        if let Some(h) = &history {
            if let Err(e) = editor.load_history(h) {
                tracing::debug!(error=%e, path=%h.display(), "no history loaded");
            }
        }
        Ok(Self {
            session,
            editor,
            history,
        })
    }

    /// Reads lines until `exit`, Ctrl-D or end of input. Ctrl-C at the prompt
    /// only clears the line.
    pub fn run(mut self) -> AppResult<()> {
        let stdout = io::stdout();
        loop {
            match self.editor.readline(PROMPT) {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    if let Err(e) = self.editor.add_history_entry(line.as_str()) {
                        tracing::debug!(error=%e, "history entry not recorded");
                    }
                    let mut out = stdout.lock();
                    match self.session.handle_line(&line, &mut out) {
                        Ok(LineOutcome::Continue) => {}
                        Ok(LineOutcome::Exit) => break,
                        Err(e) if e.is_fatal() => {
                            self.save_history();
                            return Err(e);
                        }
                        Err(e) => eprintln!("Error: {e}"),
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    eprintln!("^C");
                }
                Err(ReadlineError::Eof) => {
                    eprintln!("^D");
                    break;
                }
                Err(e) => {
                    self.save_history();
                    return Err(e.into());
                }
            }
        }
        self.save_history();
        self.session.close();
        Ok(())
    }

    fn save_history(&mut self) {
        let Some(h) = &self.history else { return };
        if let Err(e) = self.editor.save_history(h) {
            tracing::warn!(error=%e, path=%h.display(), "failed to save history");
        }
    }
}
