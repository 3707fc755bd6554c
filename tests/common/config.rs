//! Test configuration helpers

use std::path::{Path, PathBuf};
use stream_batch::Config;

/// Config writing into `out/` and `tmp/` below `root`
pub fn test_config(root: &Path, transcoder: PathBuf) -> Config {
    let mut config = Config::default();
    config.tools.transcoder_path = transcoder;
    config.tools.search_path = false;
    config.download.output_dir = root.join("out");
    config.download.temp_dir = root.join("tmp");
    config
}
