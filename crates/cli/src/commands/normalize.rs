use anyhow::Result;
use photmerge_core::config::Config;

pub fn run(config: &Config, names: &[String]) -> Result<()> {
    let normalizer = config.normalizer()?;
    for name in names {
        println!("{name}\t{}", normalizer.normalize(name));
    }
    Ok(())
}
