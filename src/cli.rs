use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use serde::Serialize;

use github_rest::pagination::ListOptions;
use github_rest::{Client, Result};

fn owner_repo(cmd: Command) -> Command {
    cmd.arg(Arg::new("owner").required(true))
        .arg(Arg::new("repo").required(true))
}

pub fn build_cli() -> Command {
    Command::new("github-rest")
        .about("Query the GitHub REST API and print the typed result as JSON")
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .num_args(1)
                .global(true)
                .help("Override RUST_LOG level (e.g., info, debug)"),
        )
        .arg(
            Arg::new("version")
                .long("version")
                .help("Print version and exit")
                .action(ArgAction::SetTrue),
        )
        .subcommand(Command::new("rate-limit").about("Show every rate limit bucket"))
        .subcommand(
            owner_repo(Command::new("rules-for-branch").about("Rules that apply to a branch"))
                .arg(Arg::new("branch").required(true)),
        )
        .subcommand(
            owner_repo(Command::new("rulesets").about("Rulesets of a repository")).arg(
                Arg::new("include-parents")
                    .long("include-parents")
                    .help("Include rulesets inherited from the organization")
                    .action(ArgAction::SetTrue),
            ),
        )
        .subcommand(
            Command::new("org-rulesets")
                .about("Rulesets of an organization")
                .arg(Arg::new("org").required(true)),
        )
        .subcommand(
            owner_repo(Command::new("secrets").about("Secret names of a repository")).arg(
                Arg::new("dependabot")
                    .long("dependabot")
                    .help("List Dependabot secrets instead of Actions secrets")
                    .action(ArgAction::SetTrue),
            ),
        )
        .subcommand(
            owner_repo(Command::new("reviews").about("Reviews of a pull request")).arg(
                Arg::new("number")
                    .required(true)
                    .value_parser(value_parser!(i64)),
            ),
        )
        .subcommand(owner_repo(
            Command::new("events").about("Recent activity in a repository"),
        ))
}

pub fn init_logging(level: Option<&str>) {
    // Respect explicit level, else default to warn so stdout stays clean JSON
    if let Some(lvl) = level {
        std::env::set_var("RUST_LOG", lvl);
    }
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();
}

fn arg<'m>(m: &'m ArgMatches, name: &str) -> &'m str {
    m.get_one::<String>(name).map(String::as_str).unwrap_or_default()
}

fn pretty<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Run the selected subcommand and render its result.
pub async fn run(client: &Client, matches: &ArgMatches) -> Result<Option<String>> {
    let Some((name, m)) = matches.subcommand() else {
        return Ok(None);
    };
    let page = ListOptions::per_page(100);
    let out = match name {
        "rate-limit" => pretty(&client.rate_limit().get().await?.value)?,
        "rules-for-branch" => {
            let rules = client
                .rulesets()
                .get_rules_for_branch(arg(m, "owner"), arg(m, "repo"), arg(m, "branch"))
                .await?;
            pretty(&rules.value)?
        }
        "rulesets" => {
            let rulesets = client
                .rulesets()
                .get_all_rulesets(arg(m, "owner"), arg(m, "repo"), m.get_flag("include-parents"))
                .await?;
            pretty(&rulesets.value)?
        }
        "org-rulesets" => {
            let rulesets = client
                .rulesets()
                .get_all_organization_rulesets(arg(m, "org"))
                .await?;
            pretty(&rulesets.value)?
        }
        "secrets" => {
            let service = if m.get_flag("dependabot") {
                client.dependabot_secrets()
            } else {
                client.actions_secrets()
            };
            let secrets = service
                .list_repo_secrets(arg(m, "owner"), arg(m, "repo"), &page)
                .await?;
            pretty(&secrets.value)?
        }
        "reviews" => {
            let number = m.get_one::<i64>("number").copied().unwrap_or_default();
            let reviews = client
                .pulls()
                .list_reviews(arg(m, "owner"), arg(m, "repo"), number, &page)
                .await?;
            pretty(&reviews.value)?
        }
        "events" => {
            let events = client
                .activity()
                .list_repository_events(arg(m, "owner"), arg(m, "repo"), &page)
                .await?;
            pretty(&events.value)?
        }
        _ => return Ok(None),
    };
    Ok(Some(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        build_cli().debug_assert();
    }

    #[test]
    fn parses_review_number() {
        let m = build_cli()
            .try_get_matches_from(["github-rest", "reviews", "o", "r", "12"])
            .unwrap();
        let (name, sub) = m.subcommand().unwrap();
        assert_eq!(name, "reviews");
        assert_eq!(sub.get_one::<i64>("number"), Some(&12));
    }

    #[test]
    fn rejects_non_numeric_review_number() {
        assert!(build_cli()
            .try_get_matches_from(["github-rest", "reviews", "o", "r", "twelve"])
            .is_err());
    }
}
