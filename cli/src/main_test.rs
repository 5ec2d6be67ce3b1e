use super::*;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("blog-cli").chain(args.iter().copied())).unwrap()
}

fn read_args(args: &[&str]) -> ReadArgs {
    match parse(args).command {
        Command::Read(read) => read,
        other => panic!("expected read, got {other:?}"),
    }
}

// =============================================================
// argument parsing
// =============================================================

#[test]
fn read_defaults_to_all_posts_one_page() {
    let args = read_args(&["read"]);
    assert_eq!(args.filter(), FeedFilter::All);
    assert_eq!(args.pages, 1);
    assert!(!args.json);
}

#[test]
fn read_author_and_mine_filters() {
    let by_author = read_args(&["read", "--author", "bob@example.com", "--pages", "3"]);
    assert_eq!(by_author.filter(), FeedFilter::Author("bob@example.com".into()));
    assert_eq!(by_author.pages, 3);

    assert_eq!(read_args(&["read", "--mine"]).filter(), FeedFilter::Own);
}

#[test]
fn read_rejects_author_with_mine() {
    let result = Cli::try_parse_from(["blog-cli", "read", "--author", "a@x", "--mine"]);
    assert!(result.is_err());
}

#[test]
fn global_base_url_override() {
    let cli = parse(&["--base-url", "http://blog.test", "whoami"]);
    assert_eq!(cli.base_url.as_deref(), Some("http://blog.test"));
    assert!(matches!(cli.command, Command::Whoami));
}

#[test]
fn post_draft_flag() {
    match parse(&["post", "--content", "hello", "--draft"]).command {
        Command::Post { content, draft } => {
            assert_eq!(content, "hello");
            assert!(draft);
        }
        other => panic!("expected post, got {other:?}"),
    }
}

#[test]
fn register_requires_confirmation() {
    let result = Cli::try_parse_from([
        "blog-cli",
        "register",
        "--email",
        "a@x",
        "--password",
        "pw",
        "--first-name",
        "A",
        "--last-name",
        "B",
    ]);
    assert!(result.is_err());
}

// =============================================================
// rendering
// =============================================================

fn sample_post() -> Post {
    Post {
        id: "p1".into(),
        author_email: "bob@example.com".into(),
        created_at: Some("2024-01-01".into()),
        content: "hello".into(),
        published: true,
    }
}

#[test]
fn render_uses_profile_name() {
    let author = UserProfile { email: Some("bob@example.com".into()), name: Some("Bob".into()), about: None };
    assert_eq!(render_post(&sample_post(), &author), "[p1] Bob <bob@example.com> 2024-01-01\n    hello");
}

#[test]
fn render_falls_back_to_email_and_marks_drafts() {
    let post = Post { created_at: None, published: false, ..sample_post() };
    assert_eq!(
        render_post(&post, &UserProfile::default()),
        "[p1] bob@example.com <bob@example.com> (draft)\n    hello"
    );
}

#[test]
fn report_maps_failure_to_error() {
    assert!(report(CompletionStatus::success("ok")).is_ok());
    let err = report(CompletionStatus::failure("nope")).unwrap_err();
    assert_eq!(err.to_string(), "nope");
}
