mod file_buffer;

pub use file_buffer::FileBuffer;
