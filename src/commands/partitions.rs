use anyhow::Result;
use clap::Args;

use crate::platform::{Partition, PlatformConfig, PlatformConfigRegistry};

#[derive(Debug, Clone, Args)]
pub struct PartitionsCommand {
    #[arg(help = "Partition to show (global or restricted); all when omitted")]
    pub partition: Option<String>,
}

impl PartitionsCommand {
    pub fn execute(self) -> Result<()> {
        let registry = PlatformConfigRegistry::standard();
        let configs = match &self.partition {
            Some(name) => vec![registry.resolve(name)?],
            None => Partition::ALL
                .iter()
                .map(|p| registry.get(*p))
                .collect::<Result<Vec<_>, _>>()?,
        };

        let rendered: Vec<String> = configs.into_iter().map(render).collect();
        println!("{}", rendered.join("\n"));
        Ok(())
    }
}

fn render(pc: &PlatformConfig) -> String {
    format!(
        "[{}]\n  default region:      {}\n  setup secret:        {}\n  ARN prefix:          {}\n  federation endpoint: {}\n  console URL:         {}\n  regions:             {}\n",
        pc.partition,
        pc.default_region,
        pc.setup_secret_name,
        pc.arn_prefix,
        pc.federation.endpoint_url,
        pc.federation.console_url,
        pc.covered_regions.join(", ")
    )
}
