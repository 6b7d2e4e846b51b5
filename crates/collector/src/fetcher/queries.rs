//! Request documents for the GitHub GraphQL schema.

pub const SEARCH_REPOS_QUERY: &str = r#"
query SearchRepos($query: String!, $first: Int!, $after: String) {
  search(query: $query, type: REPOSITORY, first: $first, after: $after) {
    pageInfo {
      hasNextPage
      endCursor
    }
    repositoryCount
    nodes {
      ... on Repository {
        ...RepositoryFields
      }
    }
  }
  rateLimit {
    remaining
    resetAt
    limit
    cost
  }
}
"#;

pub const USER_COUNT_QUERY: &str = r#"
query CountAccounts($query: String!) {
  search(query: $query, type: USER, first: 1) {
    userCount
  }
  rateLimit {
    remaining
    resetAt
  }
}
"#;

pub const USER_SEARCH_QUERY: &str = r#"
query SearchAccounts($query: String!, $first: Int!, $after: String) {
  search(query: $query, type: USER, first: $first, after: $after) {
    userCount
    pageInfo {
      hasNextPage
      endCursor
    }
    nodes {
      ... on User {
        login
        __typename
      }
      ... on Organization {
        login
        __typename
      }
    }
  }
  rateLimit {
    remaining
    resetAt
  }
}
"#;

pub const SINGLE_REPO_QUERY: &str = r#"
query GetRepo($owner: String!, $name: String!) {
  repository(owner: $owner, name: $name) {
    ...RepositoryFields
  }
  rateLimit {
    remaining
    resetAt
    limit
    cost
  }
}
"#;

pub const REPOSITORY_FIELDS: &str = r#"
fragment RepositoryFields on Repository {
  nameWithOwner
  name
  description
  url
  homepageUrl
  createdAt
  updatedAt
  pushedAt
  stargazerCount
  forkCount
  diskUsage
  primaryLanguage { name }
  languages(first: 10) { nodes { name } }
  repositoryTopics(first: 20) { nodes { topic { name } } }
  licenseInfo { key name }
  isFork
  isArchived
  isPrivate
  isTemplate
  hasWikiEnabled
  hasIssuesEnabled
  watchers { totalCount }
  issues(states: OPEN) { totalCount }
  owner {
    login
    __typename
    ... on User {
      location
      company
      bio
      email
      followers { totalCount }
      createdAt
    }
    ... on Organization {
      location
      email
      description
    }
  }
  object(expression: "HEAD:README.md") {
    ... on Blob { text }
  }
}
"#;

pub fn with_repository_fields(operation: &str) -> String {
    format!("{operation}{REPOSITORY_FIELDS}")
}
