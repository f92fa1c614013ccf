pub mod assemble;
pub mod config;
pub mod counsel;
pub mod criminal;
pub mod docket;
pub mod harness;
pub mod header;
pub mod members;
pub mod merge;
pub mod model;
pub mod nos;
pub mod page;
pub mod parties;
pub mod pipeline;
pub mod roles;
pub mod stamp;
pub mod store;
pub mod summary;
pub mod text;
pub mod ucid;
