pub mod http;
pub mod lines;
pub mod stdio;
