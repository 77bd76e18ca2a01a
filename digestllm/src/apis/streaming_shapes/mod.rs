pub mod reasoning;
pub mod sse;
pub mod utf8;
