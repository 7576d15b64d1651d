pub mod event_loop;
pub mod headless;
pub mod runtime;
pub mod serial;
pub mod server;
