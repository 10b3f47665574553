use std::path::PathBuf;

/// Fatal startup failures.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ViewerError {
    #[error("could not load gradient image {}", path.display())]
    AssetLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("gradient image is {width}x{height}; need at least 2 pixels along one axis")]
    DegenerateGradient { width: u32, height: u32 },
    #[error("could not start field workers: {0}")]
    DeviceInit(#[from] rayon::ThreadPoolBuildError),
}

pub(crate) type ViewerResult<T> = Result<T, ViewerError>;
