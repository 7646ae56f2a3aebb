use std::path::Path;

pub fn run(root: &Path, port: u16) -> anyhow::Result<()> {
    // Fail before binding when the root was never initialized.
    bud_core::config::Config::load(root)?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(bud_server::serve(root.to_path_buf(), port))
}
