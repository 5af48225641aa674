// Core module - session, audit and polling logic
pub mod audit;
pub mod principals;
pub mod probe;
pub mod runner;
pub mod session;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;
