pub mod pipeline;

pub use pipeline::{
    FrameTarget, RenderStats, frame_paths, render_frame, render_frames, resolve_thread_count,
    resume_point, save_blend_layers,
};
