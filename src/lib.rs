pub mod conversation;
pub mod core;
pub mod history;
pub mod llm;
pub mod rag;
pub mod server;
pub mod state;
pub mod tools;

#[cfg(test)]
pub(crate) mod testing;
