mod support;

use std::sync::Arc;

use anyhow::Result;
use collector::{AccountFilters, RecordBuffer};
use serde_json::Value;
use support::{
    account_page, cursor, fetcher, graphql_error, repo_node, repo_page, user_count,
    RecordingSink, StubBroker,
};

fn filters(min_stars: u64) -> AccountFilters {
    AccountFilters {
        min_stars,
        include_forks: false,
        extra_filter: String::new(),
    }
}

fn login_of(query: &str) -> &str {
    query
        .split_whitespace()
        .find_map(|part| part.strip_prefix("user:"))
        .unwrap_or_default()
}

#[tokio::test]
async fn testland_scenario_returns_alice_repositories() -> Result<()> {
    let broker = StubBroker::new(|operation, variables| {
        let query = variables["query"].as_str().unwrap_or_default();
        match operation {
            "CountAccounts" if query.contains("type:org") => Ok(user_count(0)),
            "CountAccounts" => Ok(user_count(2)),
            "SearchAccounts" => Ok(account_page(&["alice", "bob"], None)),
            "SearchRepos" => Ok(match login_of(query) {
                "alice" => repo_page(
                    vec![
                        repo_node("alice/ten", 10, "Testland"),
                        repo_node("alice/six", 6, "Testland"),
                        repo_node("alice/two", 2, "Testland"),
                    ],
                    None,
                ),
                "bob" => repo_page(Vec::new(), None),
                other => panic!("unexpected account {other}"),
            }),
            other => panic!("unexpected {other}"),
        }
    });
    let fetcher = fetcher(broker.clone());
    let mut buffer = RecordBuffer::in_memory();

    let summary = fetcher
        .fetch_by_location_two_step("Testland", true, None, &filters(5), &mut buffer)
        .await?;

    assert_eq!(summary.accounts, 2);
    assert_eq!(summary.records, 3);
    assert_eq!(summary.failed_accounts, 0);
    assert_eq!(buffer.len(), 3);
    assert!(buffer.records().iter().all(|r| r.owner_login == "alice"));

    let repo_queries: Vec<String> = broker
        .calls_to("SearchRepos")
        .iter()
        .map(|call| call.query().to_string())
        .collect();
    assert_eq!(
        repo_queries,
        vec!["user:alice stars:>=5 fork:false", "user:bob stars:>=5 fork:false"]
    );
    Ok(())
}

#[tokio::test]
async fn no_accounts_means_no_repository_requests() -> Result<()> {
    let broker = StubBroker::new(|operation, _| match operation {
        "CountAccounts" => Ok(user_count(0)),
        other => panic!("unexpected {other}"),
    });
    let fetcher = fetcher(broker.clone());
    let mut buffer = RecordBuffer::in_memory();

    let summary = fetcher
        .fetch_by_location_two_step("Nowhere", true, None, &filters(1), &mut buffer)
        .await?;

    assert_eq!(summary.accounts, 0);
    assert!(buffer.is_empty());
    assert!(broker.calls_to("SearchRepos").is_empty());
    Ok(())
}

#[tokio::test]
async fn failing_account_is_skipped() -> Result<()> {
    let broker = StubBroker::new(|_, variables| {
        let query = variables["query"].as_str().unwrap_or_default();
        match login_of(query) {
            "ghost" => Err(graphql_error("Could not resolve to a User with the login of 'ghost'.")),
            login => Ok(repo_page(
                vec![repo_node(&format!("{login}/tool"), 3, "")],
                None,
            )),
        }
    });
    let fetcher = fetcher(broker);
    let mut buffer = RecordBuffer::in_memory();
    let logins = vec!["alice".to_string(), "ghost".to_string(), "bob".to_string()];

    let summary = fetcher
        .fetch_repos_for_accounts(&logins, &filters(1), &mut buffer)
        .await?;

    assert_eq!(summary.failed_accounts, 1);
    let nwos: Vec<&str> = buffer.records().iter().map(|r| r.nwo.as_str()).collect();
    assert_eq!(nwos, vec!["alice/tool", "bob/tool"]);
    Ok(())
}

#[tokio::test]
async fn account_failing_mid_listing_contributes_nothing() -> Result<()> {
    let broker = StubBroker::new(|_, variables| {
        let query = variables["query"].as_str().unwrap_or_default();
        match (login_of(query), cursor(variables)) {
            ("flaky", None) => Ok(repo_page(
                vec![repo_node("flaky/first", 1, "")],
                Some("c1"),
            )),
            ("flaky", Some(_)) => Err(graphql_error("timeout")),
            (login, _) => Ok(repo_page(
                vec![repo_node(&format!("{login}/only"), 1, "")],
                None,
            )),
        }
    });
    let fetcher = fetcher(broker);
    let mut buffer = RecordBuffer::in_memory();
    let logins = vec!["flaky".to_string(), "steady".to_string()];

    let summary = fetcher
        .fetch_repos_for_accounts(&logins, &filters(1), &mut buffer)
        .await?;

    assert_eq!(summary.failed_accounts, 1);
    assert_eq!(summary.records, 1);
    assert_eq!(buffer.records()[0].nwo, "steady/only");
    Ok(())
}

#[tokio::test]
async fn failed_rate_limit_check_saves_gathered_records() {
    let broker = StubBroker::with_wait_budget(2, |_, variables| {
        let login = login_of(variables["query"].as_str().unwrap_or_default()).to_string();
        Ok(repo_page(vec![repo_node(&format!("{login}/tool"), 1, "")], None))
    });
    let fetcher = fetcher(broker.clone());
    let sink = Arc::new(RecordingSink::default());
    let mut buffer = RecordBuffer::new(sink.clone(), "out.csv", 100);
    let logins = vec!["alice".to_string(), "bob".to_string(), "carol".to_string()];

    let result = fetcher
        .fetch_repos_for_accounts(&logins, &filters(1), &mut buffer)
        .await;

    assert!(result.is_err());
    assert_eq!(buffer.len(), 2);
    assert_eq!(sink.saves(), vec![2]);
    assert_eq!(broker.calls_to("SearchRepos").len(), 2);
}

#[tokio::test]
async fn checkpoints_span_accounts() -> Result<()> {
    // Each account lists 40 repositories over four pages of ten.
    let broker = StubBroker::new(|_, variables| {
        let query = variables["query"].as_str().unwrap_or_default();
        let login = login_of(query).to_string();
        let page: usize = cursor(variables).map_or(0, |c| c.parse().unwrap());
        let nodes: Vec<Value> = (0..10)
            .map(|i| repo_node(&format!("{login}/r{page}-{i}"), 1, ""))
            .collect();
        let next = (page < 3).then(|| (page + 1).to_string());
        Ok(repo_page(nodes, next.as_deref()))
    });
    let fetcher = fetcher(broker.clone());
    let sink = Arc::new(RecordingSink::default());
    let mut buffer = RecordBuffer::new(sink.clone(), "out.csv", 100);
    let logins = vec!["a".to_string(), "b".to_string(), "c".to_string()];

    let summary = fetcher
        .fetch_repos_for_accounts(&logins, &filters(0), &mut buffer)
        .await?;

    assert_eq!(summary.records, 120);
    assert_eq!(sink.saves(), vec![100, 120]);
    assert_eq!(broker.calls_to("SearchRepos")[0].query(), "user:a fork:false");
    Ok(())
}
