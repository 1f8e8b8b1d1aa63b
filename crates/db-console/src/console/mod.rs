pub mod completion;
pub mod dispatch;
pub mod export;
pub mod history;
pub mod interrupt;
pub mod output;
pub mod pager;
pub mod repl;
pub mod session;
pub mod state;
