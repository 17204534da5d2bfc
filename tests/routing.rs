use kurosabi_tst::{
    Context, Method,
    router::{Pattern, Tree},
};

fn insert(tree: &mut Tree<u32>, method: Method, pattern: &str, id: u32) -> Option<u32> {
    tree.insert(method, &Pattern::new(pattern).unwrap(), id)
}

fn tree_of(routes: &[(Method, &str, u32)]) -> Tree<u32> {
    let mut tree = Tree::new();
    for (method, pattern, id) in routes {
        insert(&mut tree, *method, pattern, *id);
    }
    tree
}

/// (handler id, captured params) for one lookup
fn resolve(tree: &Tree<u32>, method: Method, path: &str) -> (Option<u32>, Vec<(String, String)>) {
    let mut ctx = Context::new();
    let found = tree.find(method, path, &mut ctx).copied();
    let params = ctx.params().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    (found, params)
}

#[test]
fn static_patterns_round_trip_for_every_method() {
    let patterns = ["/", "/a", "/ab", "/abc/def", "/z/y/x", "/users", "/users/list", "/index.html"];
    let mut tree = Tree::new();
    for (i, method) in Method::ALL.iter().enumerate() {
        for (j, pattern) in patterns.iter().enumerate() {
            insert(&mut tree, *method, pattern, (i * 100 + j) as u32);
        }
    }
    assert_eq!(tree.len(), Method::ALL.len() * patterns.len());

    for (i, method) in Method::ALL.iter().enumerate() {
        for (j, pattern) in patterns.iter().enumerate() {
            assert_eq!(resolve(&tree, *method, pattern), (Some((i * 100 + j) as u32), vec![]), "{} {}", method, pattern);
        }
    }
    assert_eq!(resolve(&tree, Method::GET, "/abc").0, None);
    assert_eq!(resolve(&tree, Method::GET, "/abc/de").0, None);
    assert_eq!(resolve(&tree, Method::GET, "/users/").0, None);
}

#[test]
fn named_parameter_captures_one_segment() {
    let tree = tree_of(&[(Method::GET, "/users/:id", 1)]);

    let (found, params) = resolve(&tree, Method::GET, "/users/42");
    assert_eq!(found, Some(1));
    assert_eq!(params, vec![("id".to_string(), "42".to_string())]);

    // 末尾スラッシュは新しいセグメント扱い
    assert_eq!(resolve(&tree, Method::GET, "/users/42/"), (None, vec![]));
    assert_eq!(resolve(&tree, Method::GET, "/users/42/x"), (None, vec![]));
    // 空セグメントは名前付きパラメータにならない
    assert_eq!(resolve(&tree, Method::GET, "/users/"), (None, vec![]));
}

#[test]
fn trailing_slash_pattern_is_distinct() {
    let tree = tree_of(&[(Method::GET, "/users/:id", 1), (Method::GET, "/users/:id/", 2)]);
    assert_eq!(resolve(&tree, Method::GET, "/users/7").0, Some(1));
    let (found, params) = resolve(&tree, Method::GET, "/users/7/");
    assert_eq!(found, Some(2));
    assert_eq!(params, vec![("id".to_string(), "7".to_string())]);
}

#[test]
fn catch_all_captures_remainder() {
    let tree = tree_of(&[(Method::GET, "/files/*path", 1)]);

    let (found, params) = resolve(&tree, Method::GET, "/files/a/b/c");
    assert_eq!(found, Some(1));
    assert_eq!(params, vec![("path".to_string(), "a/b/c".to_string())]);

    let (found, params) = resolve(&tree, Method::GET, "/files/");
    assert_eq!(found, Some(1));
    assert_eq!(params, vec![("path".to_string(), String::new())]);

    assert_eq!(resolve(&tree, Method::GET, "/files").0, None);
}

#[test]
fn static_suffix_and_several_parameters() {
    let tree = tree_of(&[
        (Method::GET, "/users/:id/posts", 1),
        (Method::GET, "/users/:id/posts/:post", 2),
        (Method::GET, "/users/:id/files/*rest", 3),
    ]);

    let (found, params) = resolve(&tree, Method::GET, "/users/9/posts");
    assert_eq!(found, Some(1));
    assert_eq!(params, vec![("id".to_string(), "9".to_string())]);

    let (found, params) = resolve(&tree, Method::GET, "/users/9/posts/hello");
    assert_eq!(found, Some(2));
    assert_eq!(
        params,
        vec![("id".to_string(), "9".to_string()), ("post".to_string(), "hello".to_string())]
    );

    let (found, params) = resolve(&tree, Method::GET, "/users/9/files/a/b.txt");
    assert_eq!(found, Some(3));
    assert_eq!(
        params,
        vec![("id".to_string(), "9".to_string()), ("rest".to_string(), "a/b.txt".to_string())]
    );

    assert_eq!(resolve(&tree, Method::GET, "/users/9/comments"), (None, vec![]));
}

#[test]
fn method_isolation() {
    let tree = tree_of(&[(Method::GET, "/x", 1), (Method::POST, "/x", 2)]);
    assert_eq!(resolve(&tree, Method::GET, "/x").0, Some(1));
    assert_eq!(resolve(&tree, Method::POST, "/x").0, Some(2));
    assert_eq!(resolve(&tree, Method::DELETE, "/x").0, None);
}

#[test]
fn last_registration_wins() {
    let mut tree = Tree::new();
    assert_eq!(insert(&mut tree, Method::GET, "/x", 1), None);
    assert_eq!(insert(&mut tree, Method::GET, "/x", 2), Some(1));
    assert_eq!(tree.len(), 1);
    assert_eq!(resolve(&tree, Method::GET, "/x").0, Some(2));
}

#[test]
fn static_segment_beats_parameter_in_any_order() {
    for routes in [
        [(Method::GET, "/users/:id", 1), (Method::GET, "/users/new", 2)],
        [(Method::GET, "/users/new", 2), (Method::GET, "/users/:id", 1)],
    ] {
        let tree = tree_of(&routes);
        assert_eq!(resolve(&tree, Method::GET, "/users/new"), (Some(2), vec![]));
        assert_eq!(resolve(&tree, Method::GET, "/users/42").0, Some(1));
        // 途中まで静的に一致しても、失敗したらパラメータに戻る
        let (found, params) = resolve(&tree, Method::GET, "/users/newer");
        assert_eq!(found, Some(1));
        assert_eq!(params, vec![("id".to_string(), "newer".to_string())]);
    }
}

#[test]
fn named_parameter_beats_catch_all() {
    let tree = tree_of(&[(Method::GET, "/x/*rest", 1), (Method::GET, "/x/:id", 2)]);
    assert_eq!(resolve(&tree, Method::GET, "/x/1"), (Some(2), vec![("id".to_string(), "1".to_string())]));
    assert_eq!(resolve(&tree, Method::GET, "/x/1/2"), (Some(1), vec![("rest".to_string(), "1/2".to_string())]));
}

#[test]
fn failed_branch_does_not_leak_captures() {
    let tree = tree_of(&[(Method::GET, "/u/:id/profile", 1), (Method::GET, "/u/*rest", 2)]);
    let (found, params) = resolve(&tree, Method::GET, "/u/7/settings");
    assert_eq!(found, Some(2));
    assert_eq!(params, vec![("rest".to_string(), "7/settings".to_string())]);

    let mut ctx = Context::new();
    ctx.add("keep", "me");
    assert_eq!(tree.find(Method::POST, "/u/7/profile", &mut ctx), None);
    assert_eq!(ctx.len(), 1);
    assert_eq!(ctx.param("keep"), Some("me"));
}

#[test]
fn parameter_names_sharing_a_marker() {
    let tree = tree_of(&[(Method::GET, "/p/:id", 1), (Method::GET, "/p/:name/edit", 2)]);
    assert_eq!(resolve(&tree, Method::GET, "/p/5"), (Some(1), vec![("id".to_string(), "5".to_string())]));
    assert_eq!(
        resolve(&tree, Method::GET, "/p/5/edit"),
        (Some(2), vec![("name".to_string(), "5".to_string())])
    );
}

#[test]
fn markers_are_never_matched_literally() {
    let tree = tree_of(&[(Method::GET, "/u/:id", 1), (Method::GET, "/a:b", 2)]);
    // セグメント先頭以外の ':' はただの文字
    assert_eq!(resolve(&tree, Method::GET, "/a:b"), (Some(2), vec![]));
    // パス中の ":id" はパラメータの値として捕まる
    assert_eq!(resolve(&tree, Method::GET, "/u/:id"), (Some(1), vec![("id".to_string(), ":id".to_string())]));
}

#[test]
fn root_level_parameters() {
    let tree = tree_of(&[(Method::GET, "/", 1), (Method::GET, "/:page", 2), (Method::GET, "/*all", 3)]);
    assert_eq!(resolve(&tree, Method::GET, "/").0, Some(1));
    assert_eq!(resolve(&tree, Method::GET, "/about"), (Some(2), vec![("page".to_string(), "about".to_string())]));
    assert_eq!(resolve(&tree, Method::GET, "/a/b"), (Some(3), vec![("all".to_string(), "a/b".to_string())]));
    assert_eq!(resolve(&tree, Method::GET, ""), (None, vec![]));
}

#[test]
fn results_do_not_depend_on_registration_order() {
    let routes: Vec<(Method, &str, u32)> = vec![
        (Method::GET, "/", 1),
        (Method::GET, "/users/:id", 2),
        (Method::GET, "/users/new", 3),
        (Method::GET, "/users/:id/posts", 4),
        (Method::GET, "/users/:uid/posts/:post", 5),
        (Method::GET, "/files/*path", 6),
        (Method::GET, "/files/readme", 7),
        (Method::POST, "/users/:id", 8),
        (Method::GET, "/a", 9),
        (Method::GET, "/a/b", 10),
        (Method::GET, "/:page/x", 11),
    ];
    let probes = [
        (Method::GET, "/"),
        (Method::GET, "/users/1"),
        (Method::GET, "/users/new"),
        (Method::GET, "/users/newer"),
        (Method::GET, "/users/1/posts"),
        (Method::GET, "/users/1/posts/2"),
        (Method::GET, "/users/1/posts/"),
        (Method::GET, "/files/readme"),
        (Method::GET, "/files/readme.md"),
        (Method::GET, "/files/a/b"),
        (Method::POST, "/users/1"),
        (Method::DELETE, "/users/1"),
        (Method::GET, "/a"),
        (Method::GET, "/a/b"),
        (Method::GET, "/a/x"),
        (Method::GET, "/q/x"),
        (Method::GET, "/nothing/here"),
    ];

    let mut orders = Vec::new();
    for shift in 0..routes.len() {
        let mut rotated = routes.clone();
        rotated.rotate_left(shift);
        orders.push(rotated.clone());
        rotated.reverse();
        orders.push(rotated);
    }

    let expected: Vec<_> = {
        let tree = tree_of(&routes);
        probes.iter().map(|(m, p)| resolve(&tree, *m, p)).collect()
    };
    for order in &orders {
        let tree = tree_of(order);
        let got: Vec<_> = probes.iter().map(|(m, p)| resolve(&tree, *m, p)).collect();
        assert_eq!(got, expected, "order {:?}", order.iter().map(|r| r.2).collect::<Vec<_>>());
    }

    // 念のため中身も確認
    assert_eq!(expected[2], (Some(3), vec![]));
    assert_eq!(expected[5].0, Some(5));
    assert_eq!(expected[9], (Some(6), vec![("path".to_string(), "a/b".to_string())]));
    // "/a/x" は静的な "/a/b" に失敗して "/:page/x" へ戻る
    assert_eq!(expected[14], (Some(11), vec![("page".to_string(), "a".to_string())]));
    assert_eq!(expected[16], (None, vec![]));
    assert_eq!(expected[15], (Some(11), vec![("page".to_string(), "q".to_string())]));
}

#[test]
fn longest_prefix_falls_back_to_registered_prefix() {
    let tree = tree_of(&[(Method::GET, "/a", 1), (Method::GET, "/a/b", 2)]);
    let mut ctx = Context::new();
    assert_eq!(tree.longest_prefix(Method::GET, "/a/b/c", &mut ctx), Some(&2));
    assert_eq!(tree.longest_prefix(Method::GET, "/a/x", &mut ctx), Some(&1));
    assert_eq!(tree.longest_prefix(Method::GET, "/a", &mut ctx), Some(&1));
    assert_eq!(tree.longest_prefix(Method::GET, "/z", &mut ctx), None);
    assert_eq!(tree.longest_prefix(Method::GET, "", &mut ctx), None);
    // メソッドごとに終端を探す
    assert_eq!(tree.longest_prefix(Method::POST, "/a/b/c", &mut ctx), None);
    assert!(ctx.is_empty());
}

#[test]
fn longest_prefix_skips_terminals_of_other_methods() {
    let tree = tree_of(&[(Method::GET, "/static", 1), (Method::POST, "/static/upload", 2)]);
    let mut ctx = Context::new();
    assert_eq!(tree.longest_prefix(Method::GET, "/static/upload/x", &mut ctx), Some(&1));
    assert_eq!(tree.longest_prefix(Method::POST, "/static/upload/x", &mut ctx), Some(&2));
}

#[test]
fn node_sharing() {
    let tree = tree_of(&[(Method::GET, "/abc", 1), (Method::GET, "/abd", 2)]);
    // "/ab" を共有して c と d が兄弟になる
    assert_eq!(tree.node_count(), 5);
    assert_eq!(tree.len(), 2);
    assert!(!tree.is_empty());
    assert!(Tree::<u32>::new().is_empty());
}

#[test]
fn parameter_names_are_tried_in_order() {
    // 名前が違うと、先に試す名前の続き (キャッチオール含む) が勝つ
    let tree = tree_of(&[(Method::GET, "/u/:id/*tail", 1), (Method::GET, "/u/:idx/p", 2)]);
    assert_eq!(
        resolve(&tree, Method::GET, "/u/1/p"),
        (Some(1), vec![("id".to_string(), "1".to_string()), ("tail".to_string(), "p".to_string())])
    );
    assert_eq!(
        resolve(&tree, Method::POST, "/u/1/p"),
        (None, vec![])
    );

    // 同じ名前なら続きの中で静的が先
    let tree = tree_of(&[(Method::GET, "/u/:id/*tail", 1), (Method::GET, "/u/:id/p", 2)]);
    assert_eq!(resolve(&tree, Method::GET, "/u/1/p"), (Some(2), vec![("id".to_string(), "1".to_string())]));
    assert_eq!(
        resolve(&tree, Method::GET, "/u/1/q"),
        (Some(1), vec![("id".to_string(), "1".to_string()), ("tail".to_string(), "q".to_string())])
    );
}
