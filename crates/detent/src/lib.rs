pub mod binds;
pub mod chooser;
pub mod collab;
pub mod config;
pub mod dispatch;
pub mod events;
pub mod haptic;
pub mod input;
pub mod pipeline;
pub mod pulse;
pub mod sys;
pub mod timer;
pub mod wheel;
