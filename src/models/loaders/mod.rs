pub mod video_loader;

pub use video_loader::load_video_file;
