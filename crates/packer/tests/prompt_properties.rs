//! Behavioural tests for prompt packing, end to end from messages to text.
//!
//! Token costs use one token per byte so the budgets below can be worked
//! out by hand.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use promptpack_core::{EncodingError, Error, HeuristicEncoder, IMAGE_TOKEN_COST, Message};
use promptpack_packer::{PromptPacker, build_prompt, estimate_tokens};
use promptpack_template::{Bindings, render};

const TEMPLATE: &str = "{{ .System }}{{ .Prompt }}{{ .Response }}";

const CHAT_TEMPLATE: &str = "{{ if .System }}<<SYS>>{{ .System }}<</SYS>>{{ end }}\
[INST] {{ .Prompt }} [/INST] {{ .Response }}</s>";

fn bytes() -> HeuristicEncoder {
    HeuristicEncoder::new(1)
}

// ── Template marker ──────────────────────────────────────────────────────

#[test]
fn uncut_render_is_deterministic() {
    let vars = Bindings {
        system: "sys",
        prompt: "question",
        response: "answer",
    };
    assert_eq!(
        render(CHAT_TEMPLATE, vars, false).unwrap(),
        render(CHAT_TEMPLATE, vars, false).unwrap()
    );
}

#[test]
fn response_is_always_rendered_without_a_marker() {
    let vars = Bindings {
        system: "",
        prompt: "q",
        response: "THE ANSWER",
    };
    for cut in [false, true] {
        let out = render("User: {{ .Prompt }}\nBot:", vars, cut).unwrap();
        assert!(out.contains("THE ANSWER"), "cut={cut}: {out}");
    }
}

#[test]
fn cut_removes_everything_after_the_marker() {
    let vars = Bindings {
        system: "",
        prompt: "q",
        response: "",
    };
    let out = render(CHAT_TEMPLATE, vars, true).unwrap();
    assert_eq!(out, "[INST] q [/INST] ");
    assert!(!out.contains("</s>"));
}

// ── Packing ──────────────────────────────────────────────────────────────

#[test]
fn single_turn_that_fits_is_rendered_unmodified() {
    let messages = vec![Message::user("why?")];
    let vars = Bindings {
        system: "be kind",
        prompt: "why?",
        response: "",
    };
    let cost = estimate_tokens(CHAT_TEMPLATE, vars, &bytes()).unwrap();

    let prompt = build_prompt(CHAT_TEMPLATE, "be kind", &messages, cost, &bytes()).unwrap();
    assert_eq!(prompt, render(CHAT_TEMPLATE, vars, true).unwrap());
}

#[test]
fn zero_window_still_yields_one_turn() {
    let messages = vec![
        Message::user("first"),
        Message::assistant("one"),
        Message::user("second"),
        Message::assistant("two"),
        Message::user("third"),
    ];
    let packed = PromptPacker::new(TEMPLATE, 0).pack(&messages, &bytes()).unwrap();
    assert_eq!(packed.prompt, "third");
    assert_eq!(packed.metadata.turns_kept, 1);
    assert!(packed.metadata.over_budget);
}

#[test]
fn extra_images_go_before_turns() {
    let messages = vec![
        Message::user("look")
            .with_image(b"zero".to_vec())
            .with_image(b"one".to_vec())
            .with_image(b"two".to_vec()),
        Message::assistant("ok"),
        Message::user("next"),
    ];
    let first_text = "look [img-0] [img-1] [img-2]ok".len();
    let first = first_text + 3 * IMAGE_TOKEN_COST;
    let second = "next".len();
    // Over by exactly one image.
    let window = first + second - IMAGE_TOKEN_COST;

    let packed = PromptPacker::new(TEMPLATE, window).pack(&messages, &bytes()).unwrap();
    let ids: Vec<usize> = packed.images.iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(packed.metadata.images_dropped, 1);
    assert_eq!(packed.metadata.turns_dropped, 0);
    assert_eq!(packed.metadata.total_tokens, window);
}

#[test]
fn last_image_of_the_oldest_turn_goes_with_its_turn() {
    let messages = vec![
        Message::user("a").with_image(vec![1]).with_image(vec![2]),
        Message::user("b"),
    ];
    let packed = PromptPacker::new(TEMPLATE, 0).pack(&messages, &bytes()).unwrap();
    assert_eq!(packed.metadata.images_dropped, 1);
    assert_eq!(packed.metadata.turns_dropped, 1);
    assert!(packed.images.is_empty());
    assert_eq!(packed.prompt, "b");
}

#[test]
fn instruction_is_carried_forward_and_truncation_halts() {
    let messages = vec![Message::user("u1"), Message::user("u2")];
    let packed = PromptPacker::new(TEMPLATE, 0)
        .with_system("sys1")
        .pack(&messages, &bytes())
        .unwrap();
    assert_eq!(packed.prompt, "sys1u2");
    assert_eq!(packed.metadata.total_tokens, "sys1u2".len());
    assert!(packed.metadata.over_budget);
}

#[test]
fn truncation_stops_after_one_carry_even_with_turns_left() {
    let messages = vec![Message::user("u1"), Message::user("u2"), Message::user("u3")];
    let packed = PromptPacker::new(TEMPLATE, 5)
        .with_system("sys1")
        .pack(&messages, &bytes())
        .unwrap();
    assert_eq!(packed.prompt, "sys1u2u3");
    assert_eq!(packed.metadata.turns_kept, 2);
    assert_eq!(packed.metadata.total_tokens, 8);
    assert!(packed.metadata.over_budget);
}

#[test]
fn unknown_role_fails_without_output() {
    let messages = vec![Message::user("hi"), Message::new("moderator", "stop")];
    let err = build_prompt(TEMPLATE, "", &messages, 100, &bytes()).unwrap_err();
    assert!(matches!(err, Error::InvalidRole(ref role) if role == "moderator"));
}

#[test]
fn placeholders_number_images_across_messages() {
    let messages = vec![
        Message::user("first").with_image(vec![1]),
        Message::user("second").with_image(vec![2]),
    ];
    let prompt = build_prompt(TEMPLATE, "", &messages, 10_000, &bytes()).unwrap();
    assert_eq!(prompt, "first [img-0]second [img-1]");
}

#[test]
fn initial_total_is_the_sum_of_fresh_costs() {
    let messages = vec![
        Message::user("alpha"),
        Message::assistant("beta"),
        Message::user("gamma").with_image(vec![9]),
    ];
    let expected = "basealphabeta".len() + "gamma [img-0]".len() + IMAGE_TOKEN_COST;

    let packed = PromptPacker::new(TEMPLATE, 0)
        .with_system("base")
        .pack(&messages, &bytes())
        .unwrap();
    assert_eq!(packed.metadata.initial_tokens, expected);
    assert_eq!(packed.metadata.turns_total, 2);
}

#[test]
fn encoder_errors_abort_the_build() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let flaky = move |text: &str| -> Result<Vec<u32>, EncodingError> {
        if counter.fetch_add(1, Ordering::SeqCst) == 1 {
            return Err(EncodingError::new("backend unavailable"));
        }
        Ok(vec![0; text.len()])
    };
    let messages = vec![Message::user("a"), Message::user("b")];
    let err = build_prompt(TEMPLATE, "", &messages, 100, &flaky).unwrap_err();
    assert!(matches!(err, Error::Encoding(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn template_errors_abort_the_build() {
    let err = build_prompt("{{ if .Prompt }}", "", &[Message::user("a")], 100, &bytes()).unwrap_err();
    assert!(matches!(err, Error::Template(_)));
}

#[test]
fn concurrent_packs_are_independent() {
    let packer = PromptPacker::new(CHAT_TEMPLATE, 4096).with_system("shared");
    let encoder = bytes();
    let prompts: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let packer = &packer;
                let encoder = &encoder;
                scope.spawn(move || {
                    let messages = vec![Message::user(format!("question {i}"))];
                    packer.pack(&messages, encoder).unwrap().prompt
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for (i, prompt) in prompts.iter().enumerate() {
        assert_eq!(
            prompt,
            &format!("<<SYS>>shared<</SYS>>[INST] question {i} [/INST] ")
        );
    }
}
