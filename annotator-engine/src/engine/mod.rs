pub mod autosave;
pub mod camera;
pub mod library;
pub mod loading;
pub mod point_cloud;
pub mod projection;
pub mod ui;
