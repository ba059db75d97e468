// CLI command definitions

use super::actions::{BuildCommand, ModuleArgs};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "transpire",
    version,
    about = "Build Kubernetes manifests for a GitOps-managed cluster",
    long_about = "Evaluates the modules listed in cluster.toml and writes their manifests, \
                  converted secrets and ArgoCD Applications to an output tree"
)]
pub struct CliArgs {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand.
#[derive(clap::Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Path to the cluster configuration file
    #[arg(
        long,
        short = 'c',
        global = true,
        env = "TRANSPIRE_CONFIG",
        default_value = "cluster.toml"
    )]
    pub config: PathBuf,

    /// Directory for module checkouts and helm state
    #[arg(long, global = true, env = "TRANSPIRE_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Dynamic configuration properties to override cluster.toml (-D key=value)
    ///
    /// Defaults: defaults.ingress_class, defaults.certificate_issuer, defaults.registry,
    /// defaults.storage_class
    /// ArgoCD: argocd.repo_url, argocd.branch, argocd.namespace, argocd.project, argocd.auto_sync
    /// Secrets: secrets.provider, secrets.vault.kvstore, secrets.sealed_secrets.cert_path
    ///
    /// Example: -Ddefaults.registry=harbor.example.org/apps -Dargocd.auto_sync=true
    #[arg(short = 'D', global = true, value_name = "KEY=VALUE")]
    pub properties: Vec<String>,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Build, print or apply module objects
    #[command(subcommand)]
    Object(ObjectCommand),

    /// Manage secret values of a module
    #[command(subcommand)]
    Secrets(SecretsCommand),

    /// Generate CI resources for a git module
    #[command(subcommand)]
    Ci(CiCommand),

    /// Inspect the images a git module builds
    #[command(subcommand)]
    Image(ImageCommand),
}

#[derive(clap::Subcommand, Debug)]
pub enum ObjectCommand {
    /// Write manifests for all modules (or one) to an output directory
    Build(BuildCommand),

    /// Print a module's objects as YAML to stdout
    Print(ModuleArgs),

    /// Apply a module's objects to the current kubectl context
    Apply(ModuleArgs),
}

#[derive(clap::Subcommand, Debug)]
pub enum SecretsCommand {
    /// Push a module's secret values to the secrets provider
    Push(ModuleArgs),
}

#[derive(clap::Subcommand, Debug)]
pub enum CiCommand {
    /// Print the Argo Workflow that builds a module's images
    Workflow(ModuleArgs),
}

#[derive(clap::Subcommand, Debug)]
pub enum ImageCommand {
    /// List the images a module builds and their tags
    List(ModuleArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_object_build() {
        let args = CliArgs::try_parse_from([
            "transpire",
            "-c",
            "cluster/cluster.toml",
            "-Ddefaults.registry=harbor.example.org/apps",
            "object",
            "build",
            "out",
            "--module",
            "echoserver",
            "--dev",
        ])
        .unwrap();

        assert_eq!(args.global.config, PathBuf::from("cluster/cluster.toml"));
        assert_eq!(args.global.properties, vec!["defaults.registry=harbor.example.org/apps"]);
        match args.command {
            Commands::Object(ObjectCommand::Build(cmd)) => {
                assert_eq!(cmd.out, PathBuf::from("out"));
                assert_eq!(cmd.module.as_deref(), Some("echoserver"));
                assert!(cmd.dev);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_module_commands() {
        let args = CliArgs::try_parse_from(["transpire", "ci", "workflow", "remote-app", "-v"]).unwrap();
        assert!(args.global.verbose);
        assert!(matches!(
            args.command,
            Commands::Ci(CiCommand::Workflow(ModuleArgs { ref module })) if module == "remote-app"
        ));

        let args = CliArgs::try_parse_from(["transpire", "secrets", "push", "echoserver"]).unwrap();
        assert!(matches!(args.command, Commands::Secrets(SecretsCommand::Push(_))));
    }

    #[test]
    fn test_module_argument_required() {
        assert!(CliArgs::try_parse_from(["transpire", "object", "print"]).is_err());
    }
}
