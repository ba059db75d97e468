//! Module build commands

use super::commands::{CiCommand, GlobalArgs, ImageCommand, ObjectCommand, SecretsCommand};
use super::display::TableRenderer;
use crate::domain::build::ClusterBuilder;
use crate::domain::config::{apply_to_cluster_config, parse_dynamic_configs, ClusterConfig};
use crate::domain::manifest::yaml::to_documents;
use crate::domain::manifest::ManifestIdentity;
use crate::infrastructure::ci::{generate_workflow, image_builds};
use crate::infrastructure::output::{ManifestWriter, Postprocessor};
use crate::infrastructure::process;
use crate::infrastructure::secrets::{ConvertSecret, SecretsProvider};
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Parser, Debug, Clone)]
pub struct BuildCommand {
    /// Output directory for the manifest tree
    #[arg(env = "TRANSPIRE_OBJECT_OUTPUT")]
    pub out: PathBuf,

    /// Build only this module (its Application is updated in place)
    #[arg(long, short = 'm')]
    pub module: Option<String>,

    /// Write plain secrets instead of converting them
    #[arg(long)]
    pub dev: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct ModuleArgs {
    /// Module name as listed in cluster.toml
    pub module: String,
}

impl GlobalArgs {
    /// Load cluster.toml and apply command line overrides.
    pub fn load_config(&self) -> anyhow::Result<Arc<ClusterConfig>> {
        let mut config = ClusterConfig::from_file(&self.config)
            .with_context(|| format!("Failed to load {}", self.config.display()))?;

        if let Some(cache_dir) = &self.cache_dir {
            config.cache_dir = Some(cache_dir.clone());
        }

        if !self.properties.is_empty() {
            let overrides = parse_dynamic_configs(&self.properties)
                .map_err(|e| anyhow::anyhow!("Failed to parse dynamic configs: {}", e))?;
            apply_to_cluster_config(&overrides, &mut config)
                .map_err(|e| anyhow::anyhow!("Failed to apply dynamic configs: {}", e))?;
        }

        debug!(
            "Loaded {} module(s) from {}",
            config.modules.len(),
            self.config.display()
        );
        Ok(Arc::new(config))
    }

    fn builder(&self) -> anyhow::Result<ClusterBuilder> {
        Ok(ClusterBuilder::new(self.load_config()?))
    }
}

impl ObjectCommand {
    pub async fn execute(&self, global: &GlobalArgs) -> anyhow::Result<()> {
        match self {
            Self::Build(cmd) => cmd.execute(global).await,
            Self::Print(args) => print_objects(global, &args.module).await,
            Self::Apply(args) => apply_objects(global, &args.module).await,
        }
    }
}

impl BuildCommand {
    pub async fn execute(&self, global: &GlobalArgs) -> anyhow::Result<()> {
        let builder = global.builder()?;
        let provider = SecretsProvider::from_config(builder.config())?;
        let writer = ManifestWriter::new(&self.out, Postprocessor::new(provider, self.dev));

        let report = builder.build(&writer, self.module.as_deref()).await?;
        println!("{}", TableRenderer::new().render_build_report(&report));

        if !report.is_success() {
            let failed: Vec<&str> = report.failures().map(|(name, _)| name).collect();
            anyhow::bail!(
                "{} of {} module(s) failed: {}",
                failed.len(),
                report.outcomes.len(),
                failed.join(", ")
            );
        }
        Ok(())
    }
}

async fn print_objects(global: &GlobalArgs, name: &str) -> anyhow::Result<()> {
    let (_, objects) = global.builder()?.objects(name).await?;
    print!("{}", to_documents(&objects)?);
    Ok(())
}

async fn apply_objects(global: &GlobalArgs, name: &str) -> anyhow::Result<()> {
    process::ensure_tool("kubectl")?;
    let (module, objects) = global.builder()?.objects(name).await?;
    let namespace = module.namespace();

    // An existing namespace is not an error.
    if let Err(e) = process::run("kubectl", ["create", "namespace", namespace], None, None).await {
        debug!("Namespace {} not created: {}", namespace, e);
    }

    let documents = to_documents(&objects)?;
    let output = process::run(
        "kubectl",
        ["apply", "-n", namespace, "-f", "-"],
        None,
        Some(documents.as_bytes()),
    )
    .await?;
    print!("{}", output);
    Ok(())
}

impl SecretsCommand {
    pub async fn execute(&self, global: &GlobalArgs) -> anyhow::Result<()> {
        match self {
            Self::Push(args) => {
                let builder = global.builder()?;
                let provider = SecretsProvider::from_config(builder.config())?;
                let (module, objects) = builder.objects(&args.module).await?;

                let mut pushed = 0;
                for object in &objects {
                    let identity = ManifestIdentity::of(object)?;
                    if !identity.is_core_secret() {
                        continue;
                    }
                    info!("Pushing secret {}", identity.name);
                    provider.push(object, module.namespace()).await?;
                    pushed += 1;
                }

                println!("Pushed {} secret(s) for module {}", pushed, module.name());
                Ok(())
            }
        }
    }
}

impl CiCommand {
    pub async fn execute(&self, global: &GlobalArgs) -> anyhow::Result<()> {
        match self {
            Self::Workflow(args) => {
                let builder = global.builder()?;
                builder.require_remote(&args.module)?;
                let module = builder.load_module(&args.module, None).await?;
                let workflow = generate_workflow(&module).await?;
                print!("{}", to_documents(&[workflow])?);
                Ok(())
            }
        }
    }
}

impl ImageCommand {
    pub async fn execute(&self, global: &GlobalArgs) -> anyhow::Result<()> {
        match self {
            Self::List(args) => {
                let builder = global.builder()?;
                builder.require_remote(&args.module)?;
                let module = builder.load_module(&args.module, None).await?;
                let images = image_builds(&module).await?;
                println!(
                    "{}",
                    TableRenderer::new().render_images(module.name(), &images)
                );
                Ok(())
            }
        }
    }
}
