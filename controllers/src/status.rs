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

use std::collections::{BTreeMap, BTreeSet};

use envc_crds::{ClusterSurvey, ConditionType, Envconfig, EnvconfigCondition, EnvconfigStatus};
use envc_fleet::error::Result as FleetResult;
use envc_resources::cluster_name;
use validator::ValidationErrors;

/// Namespaces linked to an Envconfig, or why they could not be listed, per API URL.
pub type Survey = BTreeMap<String, FleetResult<Vec<String>>>;

/// Every registered cluster plus every cluster an environment points at.
pub fn targets<'a>(envconfig: &Envconfig, registered: impl IntoIterator<Item = &'a String>) -> BTreeSet<String> {
    registered
        .into_iter()
        .cloned()
        .chain(envconfig.spec.environments.iter().map(|env| env.api_url.clone()))
        .collect()
}

/// Derive the status of `envconfig` from what was observed in each cluster.
///
/// The result only depends on the inputs, fields owned by other writers are
/// carried over from the current status.
pub fn compute_status(envconfig: &Envconfig, survey: &Survey) -> EnvconfigStatus {
    let mut status = carried_over(envconfig);

    status.clusters = survey
        .iter()
        .map(|(url, outcome)| {
            let entry = match outcome {
                Ok(namespaces) => ClusterSurvey {
                    reachable: true,
                    namespaces: namespaces.clone(),
                    error: None,
                },
                Err(err) => ClusterSurvey {
                    reachable: false,
                    namespaces: vec![],
                    error: Some(err.to_string()),
                },
            };
            (cluster_name(url).to_string(), entry)
        })
        .collect();

    status.all_environments_created = envconfig.spec.environments.iter().all(|env| {
        matches!(survey.get(&env.api_url), Some(Ok(namespaces)) if namespaces.contains(&env.namespace))
    });

    let failures: Vec<String> = survey
        .iter()
        .filter_map(|(url, outcome)| outcome.as_ref().err().map(|err| format!("{}: {}", cluster_name(url), err)))
        .collect();
    let converged = survey.len() - failures.len();

    let condition = if failures.is_empty() {
        status.error = None;
        let message = format!("{}/{} clusters converged", converged, survey.len());
        EnvconfigCondition::available(true, "all clusters converged", Some(message))
    } else {
        status.error = Some(failures.join("; "));
        let failed: Vec<&str> = survey
            .iter()
            .filter(|(_, outcome)| outcome.is_err())
            .map(|(url, _)| cluster_name(url))
            .collect();
        let message = format!(
            "{}/{} clusters converged, failed: {}",
            converged,
            survey.len(),
            failed.join(", ")
        );
        EnvconfigCondition::available(false, "cluster errors", Some(message))
    };
    set_available(&mut status, condition);

    status
}

/// The status of an Envconfig whose spec does not pass validation.
pub fn invalid_status(envconfig: &Envconfig, errors: &ValidationErrors) -> EnvconfigStatus {
    let mut status = carried_over(envconfig);
    let message = errors.to_string();

    status.error = Some(format!("invalid spec: {}", message));
    set_available(&mut status, EnvconfigCondition::available(false, "invalid spec", Some(message)));

    status
}

fn carried_over(envconfig: &Envconfig) -> EnvconfigStatus {
    envconfig.status.clone().unwrap_or_default()
}

fn set_available(status: &mut EnvconfigStatus, condition: EnvconfigCondition) {
    let available = ConditionType::Available.to_string();
    status.conditions.retain(|c| c.type_ != available);
    status.conditions.push(condition);
}

#[cfg(test)]
mod tests {
    use envc_crds::{EnvconfigSpec, Environment};
    use envc_fleet::error::Error as FleetError;
    use validator::Validate;

    use super::*;

    fn environment(name: &str, api_url: &str, namespace: &str) -> Environment {
        Environment {
            name: name.into(),
            env_class: name.into(),
            api_url: api_url.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    fn envconfig() -> Envconfig {
        let mut envconfig = Envconfig::new(
            "shop",
            EnvconfigSpec {
                environments: vec![
                    environment("dev", "https://c1", "shop-dev"),
                    environment("prod", "https://c3", "shop-prod"),
                ],
                owners: vec!["alice".into()],
                ..Default::default()
            },
        );
        envconfig.metadata.namespace = Some("team-a".into());
        envconfig
    }

    fn healthy_survey() -> Survey {
        BTreeMap::from([
            ("https://c1".to_string(), Ok(vec!["shop-dev".to_string()])),
            ("https://c2".to_string(), Ok(vec![])),
            ("https://c3".to_string(), Ok(vec!["shop-prod".to_string()])),
        ])
    }

    #[test]
    fn test_targets_include_environment_clusters() {
        let envconfig = envconfig();
        let registered = vec!["https://c1".to_string(), "https://c2".to_string()];

        let targets = targets(&envconfig, &registered);
        assert_eq!(
            targets.into_iter().collect::<Vec<_>>(),
            vec!["https://c1", "https://c2", "https://c3"]
        );
    }

    #[test]
    fn test_all_clusters_converged() {
        let status = compute_status(&envconfig(), &healthy_survey());

        assert!(status.error.is_none());
        assert!(status.all_environments_created);
        assert!(status.available());
        assert_eq!(status.clusters.len(), 3);
        assert_eq!(status.clusters["https://c1"].namespaces, vec!["shop-dev"]);
        assert_eq!(
            status.condition(ConditionType::Available).unwrap().message,
            "3/3 clusters converged"
        );
    }

    #[test]
    fn test_recomputing_is_idempotent() {
        let mut envconfig = envconfig();

        let first = compute_status(&envconfig, &healthy_survey());
        envconfig.status = Some(first.clone());
        let second = compute_status(&envconfig, &healthy_survey());

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }

    #[test]
    fn test_partial_failure_is_isolated() {
        let mut survey = healthy_survey();
        survey.insert(
            "https://c2".to_string(),
            Err(FleetError::Timeout {
                url: "https://c2".into(),
                after: std::time::Duration::from_secs(10),
            }),
        );

        let status = compute_status(&envconfig(), &survey);

        assert!(!status.available());
        assert!(status.clusters["https://c1"].reachable);
        assert!(!status.clusters["https://c2"].reachable);
        assert!(status.clusters["https://c3"].reachable);
        assert_eq!(status.clusters["https://c3"].namespaces, vec!["shop-prod"]);
        assert!(status.all_environments_created);

        let error = status.error.unwrap();
        assert!(error.starts_with("https://c2: "));
        let condition = status.conditions.iter().find(|c| c.type_ == "Available").unwrap();
        assert_eq!(condition.reason, "ClusterErrors");
        assert_eq!(condition.message, "2/3 clusters converged, failed: https://c2");
    }

    #[test]
    fn test_missing_environment_namespace() {
        let mut survey = healthy_survey();
        survey.insert("https://c3".to_string(), Ok(vec![]));

        let status = compute_status(&envconfig(), &survey);
        assert!(!status.all_environments_created);
        assert!(status.available());
    }

    #[test]
    fn test_unknown_cluster_is_reported() {
        let mut survey = healthy_survey();
        survey.insert("https://c3".to_string(), Err(FleetError::NotFound("https://c3".into())));

        let status = compute_status(&envconfig(), &survey);
        assert!(!status.all_environments_created);
        assert_eq!(
            status.error.as_deref(),
            Some("https://c3: NotFoundError: no known client for api https://c3")
        );
    }

    #[test]
    fn test_local_cluster_key() {
        let survey: Survey = BTreeMap::from([(String::new(), Ok(vec!["shop-dev".to_string()]))]);
        let status = compute_status(&envconfig(), &survey);
        assert!(status.clusters.contains_key("local"));
    }

    #[test]
    fn test_foreign_fields_and_conditions_are_kept() {
        let mut envconfig = envconfig();
        envconfig.status = Some(EnvconfigStatus {
            api_tokens_ready: true,
            api_tokens_secret: Some("shop-tokens".into()),
            conditions: vec![EnvconfigCondition {
                type_: "Tokensecret".into(),
                status: "True".into(),
                message: String::new(),
                reason: "Created".into(),
            }],
            ..EnvconfigStatus::default()
        });

        let status = compute_status(&envconfig, &healthy_survey());
        assert!(status.api_tokens_ready);
        assert_eq!(status.api_tokens_secret.as_deref(), Some("shop-tokens"));
        assert_eq!(status.conditions.len(), 2);
        assert!(status.condition(ConditionType::Tokensecret).is_some());
    }

    #[test]
    fn test_error_is_cleared_once_clusters_recover() {
        let mut envconfig = envconfig();
        let mut survey = healthy_survey();
        survey.insert("https://c2".to_string(), Err(FleetError::NotFound("https://c2".into())));
        envconfig.status = Some(compute_status(&envconfig, &survey));

        let status = compute_status(&envconfig, &healthy_survey());
        assert!(status.error.is_none());
        assert!(status.available());
        assert_eq!(status.conditions.len(), 1);
    }

    #[test]
    fn test_invalid_status() {
        let mut envconfig = envconfig();
        envconfig.spec.owners.clear();
        let errors = envconfig.spec.validate().unwrap_err();

        let status = invalid_status(&envconfig, &errors);
        assert!(!status.available());
        assert!(status.error.unwrap().starts_with("invalid spec: "));
    }
}
