// crates/github-mcp-contract/src/registry.rs
// ============================================================================
// Module: Operation Registry
// Description: Canonical toolsets and the GitHub operations they group.
// Purpose: Single source of truth for every tool the server can expose.
// Dependencies: crate::types
// ============================================================================

//! ## Overview
//! [`operation_registry`] returns every configurable toolset in a fixed
//! order. The server builds its gated view from this list and never mutates
//! it. Two sets live outside the registry and are never gated by
//! configuration: [`context_set`] is always served, and [`discovery_set`] is
//! served only when the server runs with dynamic toolsets.
//!
//! Toolset names are canonical snake case. Configuration-supplied names go
//! through [`normalize_set_name`] before matching.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::types::ApiRoute;
use crate::types::DiscoveryAction;
use crate::types::HttpMethod;
use crate::types::OperationDescriptor;
use crate::types::OperationSetSpec;
use crate::types::OperationTarget;
use crate::types::ParamKind;
use crate::types::ParamSpec;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Ungated toolset carrying identity tools.
pub const CONTEXT_SET: &str = "context";
/// Toolset carrying the dynamic discovery tools.
pub const DYNAMIC_SET: &str = "dynamic";

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Returns every configurable toolset in registration order.
///
/// Operation names are unique across the registry and the ungated sets.
#[must_use]
pub fn operation_registry() -> Vec<OperationSetSpec> {
    vec![
        repos_set(),
        issues_set(),
        users_set(),
        pull_requests_set(),
        code_security_set(),
        secret_protection_set(),
        notifications_set(),
        experiments_set(),
    ]
}

/// Returns the `context` toolset: identity of the authenticated caller.
#[must_use]
pub fn context_set() -> OperationSetSpec {
    OperationSetSpec {
        name: CONTEXT_SET,
        description: "Tools that provide context about the current user and GitHub context you \
                      are operating in",
        operations: vec![read(
            "get_me",
            "Get details of the authenticated GitHub user.",
            CONTEXT_SET,
            get("/user"),
            vec![],
        )],
    }
}

/// Returns the discovery toolset used in dynamic mode.
#[must_use]
pub fn discovery_set() -> OperationSetSpec {
    OperationSetSpec {
        name: DYNAMIC_SET,
        description: "Discover GitHub MCP tools that can help achieve tasks by enabling \
                      additional sets of tools",
        operations: vec![
            discovery(
                "list_available_toolsets",
                "List all available toolsets this GitHub MCP server can offer, providing the \
                 enabled status of each. Use this when a task could be achieved with a GitHub \
                 tool and the currently available tools aren't enough.",
                DiscoveryAction::ListAvailableToolsets,
                vec![],
            ),
            discovery(
                "get_toolset_tools",
                "Lists all the capabilities that are enabled with the specified toolset.",
                DiscoveryAction::GetToolsetTools,
                vec![ParamSpec::required("toolset", ParamKind::String, "The name of the toolset.")],
            ),
            discovery(
                "enable_toolset",
                "Enable one of the sets of tools the GitHub MCP server provides.",
                DiscoveryAction::EnableToolset,
                vec![ParamSpec::required(
                    "toolset",
                    ParamKind::String,
                    "The name of the toolset to enable.",
                )],
            ),
        ],
    }
}

/// Normalizes a configuration-supplied toolset name.
///
/// Matching is case-insensitive and treats `-` and `_` as equivalent.
#[must_use]
pub fn normalize_set_name(name: &str) -> String {
    name.trim().to_ascii_lowercase().replace('-', "_")
}

// ============================================================================
// SECTION: Toolsets
// ============================================================================

/// `repos`: repository contents, branches, commits, and tags.
fn repos_set() -> OperationSetSpec {
    const SET: &str = "repos";
    OperationSetSpec {
        name: SET,
        description: "GitHub Repository related tools",
        operations: vec![
            read(
                "search_repositories",
                "Search for GitHub repositories.",
                SET,
                get("/search/repositories"),
                with_paging(vec![ParamSpec::required("q", ParamKind::String, "Search query.")]),
            ),
            read(
                "get_file_contents",
                "Get the contents of a file or directory from a GitHub repository.",
                SET,
                get("/repos/{owner}/{repo}/contents/{path}"),
                repo_params(vec![
                    ParamSpec::required("path", ParamKind::String, "Path to file or directory."),
                    ParamSpec::optional("ref", ParamKind::String, "Git ref (branch, tag, or SHA)."),
                ]),
            ),
            read(
                "list_commits",
                "Get list of commits of a branch in a GitHub repository.",
                SET,
                get("/repos/{owner}/{repo}/commits"),
                with_paging(repo_params(vec![ParamSpec::optional(
                    "sha",
                    ParamKind::String,
                    "SHA or branch name to start listing from.",
                )])),
            ),
            read(
                "search_code",
                "Search for code across GitHub repositories.",
                SET,
                get("/search/code"),
                with_paging(vec![ParamSpec::required("q", ParamKind::String, "Search query.")]),
            ),
            read(
                "get_commit",
                "Get details for a commit from a GitHub repository.",
                SET,
                get("/repos/{owner}/{repo}/commits/{sha}"),
                repo_params(vec![ParamSpec::required(
                    "sha",
                    ParamKind::String,
                    "Commit SHA, branch name, or tag name.",
                )]),
            ),
            read(
                "list_branches",
                "List branches in a GitHub repository.",
                SET,
                get("/repos/{owner}/{repo}/branches"),
                with_paging(repo_params(vec![])),
            ),
            read(
                "list_tags",
                "List git tags in a GitHub repository.",
                SET,
                get("/repos/{owner}/{repo}/tags"),
                with_paging(repo_params(vec![])),
            ),
            read(
                "get_tag",
                "Get details about a specific git tag object.",
                SET,
                get("/repos/{owner}/{repo}/git/tags/{tag_sha}"),
                repo_params(vec![ParamSpec::required(
                    "tag_sha",
                    ParamKind::String,
                    "SHA of the tag object.",
                )]),
            ),
            write(
                "create_or_update_file",
                "Create or update a single file in a GitHub repository.",
                SET,
                route(HttpMethod::Put, "/repos/{owner}/{repo}/contents/{path}"),
                repo_params(vec![
                    ParamSpec::required("path", ParamKind::String, "Path where to write the file."),
                    ParamSpec::required("message", ParamKind::String, "Commit message."),
                    ParamSpec::required("content", ParamKind::String, "Base64 encoded content."),
                    ParamSpec::optional("branch", ParamKind::String, "Branch to write to."),
                    ParamSpec::optional(
                        "sha",
                        ParamKind::String,
                        "Blob SHA of the file being replaced.",
                    ),
                ]),
            ),
            write(
                "create_repository",
                "Create a new GitHub repository in your account.",
                SET,
                route(HttpMethod::Post, "/user/repos"),
                vec![
                    ParamSpec::required("name", ParamKind::String, "Repository name."),
                    ParamSpec::optional(
                        "description",
                        ParamKind::String,
                        "Repository description.",
                    ),
                    ParamSpec::optional("private", ParamKind::Boolean, "Whether repo is private."),
                    ParamSpec::optional("auto_init", ParamKind::Boolean, "Initialize with README."),
                ],
            ),
            write(
                "fork_repository",
                "Fork a GitHub repository to your account or specified organization.",
                SET,
                route(HttpMethod::Post, "/repos/{owner}/{repo}/forks"),
                repo_params(vec![ParamSpec::optional(
                    "organization",
                    ParamKind::String,
                    "Organization to fork to.",
                )]),
            ),
            write(
                "create_branch",
                "Create a new git reference in a GitHub repository.",
                SET,
                route(HttpMethod::Post, "/repos/{owner}/{repo}/git/refs"),
                repo_params(vec![
                    ParamSpec::required(
                        "ref",
                        ParamKind::String,
                        "Fully qualified reference, e.g. refs/heads/feature.",
                    ),
                    ParamSpec::required("sha", ParamKind::String, "Commit SHA to point at."),
                ]),
            ),
            write(
                "delete_file",
                "Delete a file from a GitHub repository.",
                SET,
                route(HttpMethod::Delete, "/repos/{owner}/{repo}/contents/{path}"),
                repo_params(vec![
                    ParamSpec::required("path", ParamKind::String, "Path to the file to delete."),
                    ParamSpec::required("message", ParamKind::String, "Commit message."),
                    ParamSpec::required("sha", ParamKind::String, "Blob SHA of the file."),
                    ParamSpec::optional("branch", ParamKind::String, "Branch to delete from."),
                ]),
            ),
        ],
    }
}

/// `issues`: issue reads, search, and updates.
fn issues_set() -> OperationSetSpec {
    const SET: &str = "issues";
    OperationSetSpec {
        name: SET,
        description: "GitHub Issues related tools",
        operations: vec![
            read(
                "get_issue",
                "Get details of a specific issue in a GitHub repository.",
                SET,
                get("/repos/{owner}/{repo}/issues/{issue_number}"),
                repo_params(vec![issue_number()]),
            ),
            read(
                "search_issues",
                "Search for issues in GitHub repositories.",
                SET,
                get("/search/issues"),
                with_paging(vec![
                    ParamSpec::required("q", ParamKind::String, "Search query."),
                    ParamSpec::optional("sort", ParamKind::String, "Sort field."),
                    ParamSpec::optional("order", ParamKind::String, "Sort order (asc or desc)."),
                ]),
            ),
            read(
                "list_issues",
                "List issues in a GitHub repository.",
                SET,
                get("/repos/{owner}/{repo}/issues"),
                with_paging(repo_params(vec![
                    ParamSpec::optional("state", ParamKind::String, "open, closed, or all."),
                    ParamSpec::optional("labels", ParamKind::String, "Comma separated labels."),
                    ParamSpec::optional("since", ParamKind::String, "ISO 8601 timestamp."),
                ])),
            ),
            read(
                "get_issue_comments",
                "Get comments for a specific issue in a GitHub repository.",
                SET,
                get("/repos/{owner}/{repo}/issues/{issue_number}/comments"),
                with_paging(repo_params(vec![issue_number()])),
            ),
            write(
                "create_issue",
                "Create a new issue in a GitHub repository.",
                SET,
                route(HttpMethod::Post, "/repos/{owner}/{repo}/issues"),
                repo_params(vec![
                    ParamSpec::required("title", ParamKind::String, "Issue title."),
                    ParamSpec::optional("body", ParamKind::String, "Issue body content."),
                    ParamSpec::optional(
                        "assignees",
                        ParamKind::StringArray,
                        "Usernames to assign.",
                    ),
                    ParamSpec::optional("labels", ParamKind::StringArray, "Labels to apply."),
                ]),
            ),
            write(
                "add_issue_comment",
                "Add a comment to a specific issue in a GitHub repository.",
                SET,
                route(HttpMethod::Post, "/repos/{owner}/{repo}/issues/{issue_number}/comments"),
                repo_params(vec![
                    issue_number(),
                    ParamSpec::required("body", ParamKind::String, "Comment content."),
                ]),
            ),
            write(
                "update_issue",
                "Update an existing issue in a GitHub repository.",
                SET,
                route(HttpMethod::Patch, "/repos/{owner}/{repo}/issues/{issue_number}"),
                repo_params(vec![
                    issue_number(),
                    ParamSpec::optional("title", ParamKind::String, "New title."),
                    ParamSpec::optional("body", ParamKind::String, "New description."),
                    ParamSpec::optional("state", ParamKind::String, "open or closed."),
                    ParamSpec::optional("labels", ParamKind::StringArray, "New labels."),
                    ParamSpec::optional("assignees", ParamKind::StringArray, "New assignees."),
                ]),
            ),
        ],
    }
}

/// `users`: user search.
fn users_set() -> OperationSetSpec {
    const SET: &str = "users";
    OperationSetSpec {
        name: SET,
        description: "GitHub User related tools",
        operations: vec![read(
            "search_users",
            "Search for GitHub users.",
            SET,
            get("/search/users"),
            with_paging(vec![ParamSpec::required("q", ParamKind::String, "Search query.")]),
        )],
    }
}

/// `pull_requests`: pull request reads, reviews, and merges.
fn pull_requests_set() -> OperationSetSpec {
    const SET: &str = "pull_requests";
    OperationSetSpec {
        name: SET,
        description: "GitHub Pull Request related tools",
        operations: vec![
            read(
                "get_pull_request",
                "Get details of a specific pull request in a GitHub repository.",
                SET,
                get("/repos/{owner}/{repo}/pulls/{pull_number}"),
                repo_params(vec![pull_number()]),
            ),
            read(
                "list_pull_requests",
                "List pull requests in a GitHub repository.",
                SET,
                get("/repos/{owner}/{repo}/pulls"),
                with_paging(repo_params(vec![
                    ParamSpec::optional("state", ParamKind::String, "open, closed, or all."),
                    ParamSpec::optional("head", ParamKind::String, "Filter by head user:branch."),
                    ParamSpec::optional("base", ParamKind::String, "Filter by base branch."),
                ])),
            ),
            read(
                "get_pull_request_files",
                "Get the files changed in a specific pull request.",
                SET,
                get("/repos/{owner}/{repo}/pulls/{pull_number}/files"),
                with_paging(repo_params(vec![pull_number()])),
            ),
            read(
                "get_pull_request_comments",
                "Get comments for a specific pull request.",
                SET,
                get("/repos/{owner}/{repo}/pulls/{pull_number}/comments"),
                with_paging(repo_params(vec![pull_number()])),
            ),
            read(
                "get_pull_request_reviews",
                "Get reviews for a specific pull request.",
                SET,
                get("/repos/{owner}/{repo}/pulls/{pull_number}/reviews"),
                with_paging(repo_params(vec![pull_number()])),
            ),
            write(
                "merge_pull_request",
                "Merge a pull request in a GitHub repository.",
                SET,
                route(HttpMethod::Put, "/repos/{owner}/{repo}/pulls/{pull_number}/merge"),
                repo_params(vec![
                    pull_number(),
                    ParamSpec::optional("commit_title", ParamKind::String, "Merge commit title."),
                    ParamSpec::optional(
                        "commit_message",
                        ParamKind::String,
                        "Extra detail for the merge commit.",
                    ),
                    ParamSpec::optional(
                        "merge_method",
                        ParamKind::String,
                        "merge, squash, or rebase.",
                    ),
                ]),
            ),
            write(
                "update_pull_request_branch",
                "Update the branch of a pull request with the latest changes from the base branch.",
                SET,
                route(HttpMethod::Put, "/repos/{owner}/{repo}/pulls/{pull_number}/update-branch"),
                repo_params(vec![
                    pull_number(),
                    ParamSpec::optional(
                        "expected_head_sha",
                        ParamKind::String,
                        "Expected SHA of the pull request head.",
                    ),
                ]),
            ),
            write(
                "create_pull_request",
                "Create a new pull request in a GitHub repository.",
                SET,
                route(HttpMethod::Post, "/repos/{owner}/{repo}/pulls"),
                repo_params(vec![
                    ParamSpec::required("title", ParamKind::String, "Pull request title."),
                    ParamSpec::required("head", ParamKind::String, "Branch containing changes."),
                    ParamSpec::required("base", ParamKind::String, "Branch to merge into."),
                    ParamSpec::optional("body", ParamKind::String, "Pull request description."),
                    ParamSpec::optional("draft", ParamKind::Boolean, "Create as draft."),
                ]),
            ),
            write(
                "update_pull_request",
                "Update an existing pull request in a GitHub repository.",
                SET,
                route(HttpMethod::Patch, "/repos/{owner}/{repo}/pulls/{pull_number}"),
                repo_params(vec![
                    pull_number(),
                    ParamSpec::optional("title", ParamKind::String, "New title."),
                    ParamSpec::optional("body", ParamKind::String, "New description."),
                    ParamSpec::optional("state", ParamKind::String, "open or closed."),
                    ParamSpec::optional("base", ParamKind::String, "New base branch name."),
                ]),
            ),
        ],
    }
}

/// `code_security`: code scanning alerts.
fn code_security_set() -> OperationSetSpec {
    const SET: &str = "code_security";
    OperationSetSpec {
        name: SET,
        description: "Code security related tools, such as GitHub Code Scanning",
        operations: vec![
            read(
                "get_code_scanning_alert",
                "Get details of a specific code scanning alert in a GitHub repository.",
                SET,
                get("/repos/{owner}/{repo}/code-scanning/alerts/{alert_number}"),
                repo_params(vec![alert_number()]),
            ),
            read(
                "list_code_scanning_alerts",
                "List code scanning alerts in a GitHub repository.",
                SET,
                get("/repos/{owner}/{repo}/code-scanning/alerts"),
                repo_params(vec![
                    ParamSpec::optional("ref", ParamKind::String, "Git reference to filter by."),
                    ParamSpec::optional(
                        "state",
                        ParamKind::String,
                        "open, closed, dismissed, fixed.",
                    ),
                    ParamSpec::optional("severity", ParamKind::String, "Alert severity."),
                    ParamSpec::optional("tool_name", ParamKind::String, "Scanning tool name."),
                ]),
            ),
        ],
    }
}

/// `secret_protection`: secret scanning alerts.
fn secret_protection_set() -> OperationSetSpec {
    const SET: &str = "secret_protection";
    OperationSetSpec {
        name: SET,
        description: "Secret protection related tools, such as GitHub Secret Scanning",
        operations: vec![
            read(
                "get_secret_scanning_alert",
                "Get details of a specific secret scanning alert in a GitHub repository.",
                SET,
                get("/repos/{owner}/{repo}/secret-scanning/alerts/{alert_number}"),
                repo_params(vec![alert_number()]),
            ),
            read(
                "list_secret_scanning_alerts",
                "List secret scanning alerts in a GitHub repository.",
                SET,
                get("/repos/{owner}/{repo}/secret-scanning/alerts"),
                repo_params(vec![
                    ParamSpec::optional("state", ParamKind::String, "open or resolved."),
                    ParamSpec::optional("secret_type", ParamKind::String, "Comma separated types."),
                    ParamSpec::optional("resolution", ParamKind::String, "Resolution filter."),
                ]),
            ),
        ],
    }
}

/// `notifications`: notification inbox and subscriptions.
fn notifications_set() -> OperationSetSpec {
    const SET: &str = "notifications";
    OperationSetSpec {
        name: SET,
        description: "GitHub Notifications related tools",
        operations: vec![
            read(
                "list_notifications",
                "Lists all GitHub notifications for the authenticated user.",
                SET,
                get("/notifications"),
                with_paging(vec![
                    ParamSpec::optional("all", ParamKind::Boolean, "Include read notifications."),
                    ParamSpec::optional(
                        "participating",
                        ParamKind::Boolean,
                        "Only notifications the user participates in.",
                    ),
                    ParamSpec::optional("since", ParamKind::String, "ISO 8601 timestamp."),
                ]),
            ),
            read(
                "get_notification_details",
                "Get detailed information for a specific GitHub notification.",
                SET,
                get("/notifications/threads/{thread_id}"),
                vec![thread_id()],
            ),
            write(
                "dismiss_notification",
                "Mark a notification thread as read.",
                SET,
                route(HttpMethod::Patch, "/notifications/threads/{thread_id}"),
                vec![thread_id()],
            ),
            write(
                "mark_all_notifications_read",
                "Mark all notifications as read.",
                SET,
                route(HttpMethod::Put, "/notifications"),
                vec![ParamSpec::optional(
                    "last_read_at",
                    ParamKind::String,
                    "Mark notifications updated before this ISO 8601 time.",
                )],
            ),
            write(
                "manage_notification_subscription",
                "Manage a notification subscription: ignore or watch a notification thread.",
                SET,
                route(HttpMethod::Put, "/notifications/threads/{thread_id}/subscription"),
                vec![
                    thread_id(),
                    ParamSpec::required("ignored", ParamKind::Boolean, "Mute the thread."),
                ],
            ),
            write(
                "manage_repository_notification_subscription",
                "Manage a repository notification subscription: ignore or watch a repository.",
                SET,
                route(HttpMethod::Put, "/repos/{owner}/{repo}/subscription"),
                repo_params(vec![
                    ParamSpec::optional("subscribed", ParamKind::Boolean, "Receive notifications."),
                    ParamSpec::optional("ignored", ParamKind::Boolean, "Block notifications."),
                ]),
            ),
        ],
    }
}

/// `experiments`: placeholder for unstable features.
fn experiments_set() -> OperationSetSpec {
    OperationSetSpec {
        name: "experiments",
        description: "Experimental features that are not considered stable yet",
        operations: Vec::new(),
    }
}

// ============================================================================
// SECTION: Builders
// ============================================================================

/// Builds a read-only API operation.
fn read(
    name: &'static str,
    description: &'static str,
    set_name: &'static str,
    route: ApiRoute,
    params: Vec<ParamSpec>,
) -> OperationDescriptor {
    OperationDescriptor {
        name,
        description,
        mutating: false,
        set_name,
        target: OperationTarget::Api {
            route,
        },
        params,
    }
}

/// Builds a mutating API operation.
fn write(
    name: &'static str,
    description: &'static str,
    set_name: &'static str,
    route: ApiRoute,
    params: Vec<ParamSpec>,
) -> OperationDescriptor {
    OperationDescriptor {
        mutating: true,
        ..read(name, description, set_name, route, params)
    }
}

/// Builds a discovery operation.
const fn discovery(
    name: &'static str,
    description: &'static str,
    action: DiscoveryAction,
    params: Vec<ParamSpec>,
) -> OperationDescriptor {
    OperationDescriptor {
        name,
        description,
        mutating: false,
        set_name: DYNAMIC_SET,
        target: OperationTarget::Discovery {
            action,
        },
        params,
    }
}

/// Builds a route.
const fn route(method: HttpMethod, path: &'static str) -> ApiRoute {
    ApiRoute {
        method,
        path,
    }
}

/// Builds a `GET` route.
const fn get(path: &'static str) -> ApiRoute {
    route(HttpMethod::Get, path)
}

/// Prepends the `owner` and `repo` parameters.
fn repo_params(rest: Vec<ParamSpec>) -> Vec<ParamSpec> {
    let mut params = vec![
        ParamSpec::required("owner", ParamKind::String, "Repository owner."),
        ParamSpec::required("repo", ParamKind::String, "Repository name."),
    ];
    params.extend(rest);
    params
}

/// Appends the `page` and `per_page` parameters.
fn with_paging(mut params: Vec<ParamSpec>) -> Vec<ParamSpec> {
    params.push(ParamSpec::optional("page", ParamKind::Integer, "Page number (min 1)."));
    params.push(ParamSpec::optional("per_page", ParamKind::Integer, "Results per page (max 100)."));
    params
}

/// `issue_number` path parameter.
const fn issue_number() -> ParamSpec {
    ParamSpec::required("issue_number", ParamKind::Integer, "Issue number.")
}

/// `pull_number` path parameter.
const fn pull_number() -> ParamSpec {
    ParamSpec::required("pull_number", ParamKind::Integer, "Pull request number.")
}

/// `alert_number` path parameter.
const fn alert_number() -> ParamSpec {
    ParamSpec::required("alert_number", ParamKind::Integer, "Alert number.")
}

/// `thread_id` path parameter.
const fn thread_id() -> ParamSpec {
    ParamSpec::required("thread_id", ParamKind::String, "Notification thread identifier.")
}

// ============================================================================
// SECTION: Tests
// ============================================================================
