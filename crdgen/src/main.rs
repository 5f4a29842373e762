// Copyright 2024 The Envconfig Operator Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use clap::Parser;
use envc_crds::Envconfig;
use kube::CustomResourceExt;
use serde::Serialize;

/// Generate custom resource definitions for the Envconfig fleet operator.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Print the names of the custom resource definition.
    #[arg(short, long)]
    list: bool,
    /// Names of the custom resource definition, separated by comma.
    #[arg(short, long)]
    names: Option<String>,
    /// Which output path to write to, If not specified, will print to stdout.
    #[arg(short, long)]
    output: Option<String>,
}

fn main() -> anyhow::Result<()> {
    run(Args::parse())
}

fn mappings() -> BTreeMap<&'static str, (&'static str, impl Serialize)> {
    BTreeMap::from([("envconfig", ("envconfig.yaml", Envconfig::crd()))])
}

fn run(args: Args) -> anyhow::Result<()> {
    let mappings = mappings();
    let all_names: Vec<&str> = mappings.keys().copied().collect();

    // Print the names of the custom resource definition sorted by name.
    if args.list {
        for name in all_names {
            println!("{}", name);
        }
        return Ok(());
    }

    // Parse the inputted names, if not specified, use all names.
    let names: Vec<&str> = args.names.as_ref().map(|s| s.split(',').collect()).unwrap_or(all_names);

    let mut dir: Option<&Path> = None;
    if let Some(output) = &args.output {
        let path = Path::new(output);
        if !path.exists() {
            bail!("The given output path is not exists");
        }
        dir = Some(path);
    }

    for name in names {
        let Some((filename, data)) = mappings.get(name) else {
            bail!("The given name is not valid: {}", name);
        };
        generate(dir, filename, data)?;
    }

    Ok(())
}

/// Generate custom resource definitions with the given output path and filename.
fn generate<T>(dir: Option<&Path>, filename: &str, data: &T) -> anyhow::Result<()>
where
    T: ?Sized + Serialize,
{
    let definition = serde_yaml::to_string(data)?;

    if let Some(dir) = dir {
        let path = dir.join(filename);
        fs::write(&path, definition).with_context(|| format!("Couldn't write to file {:?}", path))?;
    } else {
        println!("{}\n---\n", definition);
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn args(list: bool, names: Option<&str>, output: Option<&Path>) -> Args {
        Args {
            list,
            names: names.map(String::from),
            output: output.map(|p| p.to_string_lossy().into_owned()),
        }
    }

    #[test]
    fn test_mappings_names() {
        let names: Vec<&str> = mappings().keys().copied().collect();
        assert_eq!(names, vec!["envconfig"]);
    }

    #[test]
    fn test_run_with_list() {
        assert!(run(args(true, None, None)).is_ok());
    }

    #[test]
    fn test_run_with_invalid_names() {
        let err = run(args(false, Some("invalid"), None)).unwrap_err();
        assert!(err.to_string().contains("The given name is not valid: invalid"));
    }

    #[test]
    fn test_run_with_missing_output() {
        let tempdir = tempfile::tempdir().unwrap();
        let missing = tempdir.path().join("missing");
        assert!(run(args(false, None, Some(&missing))).is_err());
    }

    /// test the output path.
    /// use tempfile to create a temporary directory.
    #[test]
    fn test_run_with_output() {
        let tempdir = tempfile::tempdir().unwrap();
        run(args(false, Some("envconfig"), Some(tempdir.path()))).unwrap();

        let envconfig = tempdir.path().join("envconfig.yaml");
        assert!(envconfig.exists());

        let content = fs::read_to_string(envconfig).unwrap();
        assert!(content.contains("envconfigs.company.tld"));
        assert!(content.contains("shortNames"));
    }
}
