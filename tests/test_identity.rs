// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Shared references, aliasing and cycles.

use std::cell::RefCell;
use std::rc::Rc;

use heirloom::{persist_object, Error, Heirloom, Link, Preservation, Settings, WeakLink};

#[derive(Debug)]
struct Pair {
    left: Rc<String>,
    right: Rc<String>,
}

persist_object!(Pair {
    left: Rc<String>,
    right: Rc<String>,
});

#[test]
fn aliased_references_stay_aliased() {
    let mut h = Heirloom::default();
    h.register::<Pair>("Pair").unwrap();

    let shared = Rc::new(String::from("both sides"));
    let pair = Pair {
        left: shared.clone(),
        right: shared,
    };
    let back: Pair = h.deserialize(&h.serialize(&pair).unwrap()).unwrap();
    assert_eq!(*back.left, "both sides");
    assert!(Rc::ptr_eq(&back.left, &back.right));
}

#[test]
fn without_preservation_aliases_are_copied() {
    let mut h = Heirloom::new(Settings::default().preservation(Preservation::DoNotPreserve));
    h.register::<Pair>("Pair").unwrap();

    let shared = Rc::new(String::from("copied"));
    let pair = Pair {
        left: shared.clone(),
        right: shared,
    };
    let back: Pair = h.deserialize(&h.serialize(&pair).unwrap()).unwrap();
    assert_eq!(*back.left, *back.right);
    assert!(!Rc::ptr_eq(&back.left, &back.right));
}

struct Node {
    value: i32,
    next: Link<Node>,
}

persist_object!(Node {
    value: i32,
    next: Link<Node>,
});

#[test]
fn two_node_cycle_preserves_pointer_identity() {
    let mut h = Heirloom::default();
    h.register::<Node>("Node").unwrap();

    let a = Rc::new(Node {
        value: 1,
        next: Link::new(),
    });
    let b = Rc::new(Node {
        value: 2,
        next: Link::new(),
    });
    a.next.set(b.clone());
    b.next.set(a.clone());

    let bytes = h.serialize(&a).unwrap();
    let back: Rc<Node> = h.deserialize(&bytes).unwrap();
    assert_eq!(back.value, 1);
    let second = back.next.get().unwrap();
    assert_eq!(second.value, 2);
    let third = second.next.get().unwrap();
    assert!(Rc::ptr_eq(&third, &back));
}

#[test]
fn self_cycle_resolves_through_the_fixup() {
    let mut h = Heirloom::default();
    h.register::<Node>("Node").unwrap();

    let a = Rc::new(Node {
        value: 7,
        next: Link::new(),
    });
    a.next.set(a.clone());

    let back: Rc<Node> = h.deserialize(&h.serialize(&a).unwrap()).unwrap();
    assert!(Rc::ptr_eq(&back.next.get().unwrap(), &back));
}

struct TreeNode {
    value: i32,
    children: Vec<Rc<RefCell<TreeNode>>>,
    parent: WeakLink<RefCell<TreeNode>>,
}

persist_object!(TreeNode {
    value: i32,
    children: Vec<Rc<RefCell<TreeNode>>>,
    parent: WeakLink<RefCell<TreeNode>>,
});

#[test]
fn parent_pointers_resolve_after_the_operation() {
    let mut h = Heirloom::default();
    h.register::<TreeNode>("TreeNode").unwrap();

    let root = Rc::new(RefCell::new(TreeNode {
        value: 0,
        children: vec![],
        parent: WeakLink::new(),
    }));
    for value in 1..=2 {
        let child = Rc::new(RefCell::new(TreeNode {
            value,
            children: vec![],
            parent: WeakLink::to(&root),
        }));
        root.borrow_mut().children.push(child);
    }

    let back: Rc<RefCell<TreeNode>> = h.deserialize(&h.serialize(&root).unwrap()).unwrap();
    assert_eq!(back.borrow().children.len(), 2);
    for child in &back.borrow().children {
        let parent = child.borrow().parent.upgrade().unwrap();
        assert!(Rc::ptr_eq(&parent, &back));
    }
}

#[derive(Debug)]
struct Knot {
    next: RefCell<Option<Rc<Knot>>>,
}

persist_object!(Knot {
    next: RefCell<Option<Rc<Knot>>>,
});

#[test]
fn cycles_through_plain_rc_edges_are_rejected_on_read() {
    let mut h = Heirloom::default();
    h.register::<Knot>("Knot").unwrap();

    let a = Rc::new(Knot {
        next: RefCell::new(None),
    });
    *a.next.borrow_mut() = Some(a.clone());

    let bytes = h.serialize(&a).unwrap();
    let err = h.deserialize::<Rc<Knot>>(&bytes).unwrap_err();
    assert!(matches!(err, Error::InvalidRef(_)));
}

#[test]
fn cyclic_graph_without_preservation_exceeds_depth() {
    let mut h = Heirloom::new(
        Settings::default()
            .preservation(Preservation::DoNotPreserve)
            .max_depth(16),
    );
    h.register::<Node>("Node").unwrap();

    let a = Rc::new(Node {
        value: 1,
        next: Link::new(),
    });
    a.next.set(a.clone());

    let err = h.serialize(&a).unwrap_err();
    assert!(matches!(err, Error::DepthExceeded(_)));
}
