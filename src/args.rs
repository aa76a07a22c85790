use clap::Parser;

#[derive(Parser, Clone)]
#[command(author, version, about, long_about = None)]
pub(crate) struct Args {
    /// Address the HTTP surface listens on.
    #[arg(long, env = "GRAIN_HOST", default_value = "0.0.0.0:5000")]
    pub(crate) host: String,

    /// Root directory for blobs/, uploads/, and manifests/.
    #[arg(long, env = "GRAIN_DATA_DIR", default_value = "data")]
    pub(crate) data_dir: String,
}
