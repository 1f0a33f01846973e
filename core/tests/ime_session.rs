// core/tests/ime_session.rs
//
// End-to-end IME session tests: window messages in, polled events out.

use libimm_core::message::{WM_IME_COMPOSITION, WM_IME_ENDCOMPOSITION, WM_IME_STARTCOMPOSITION};
use libimm_core::{
    replay, CompositionState, GcsIndex, Hwnd, ImeConfig, ScriptedImm, Trace, WindowsIme,
};
use std::thread;

const HWND: Hwnd = Hwnd(0x42);

/// Deliver a message the way a window procedure would.
fn dispatch(ime: &mut WindowsIme<ScriptedImm>, msg: u32, lparam: isize) -> bool {
    if ime.handles_message(msg) {
        ime.handle_message(msg, 0, lparam);
        true
    } else {
        false
    }
}

fn type_composition(ime: &mut WindowsIme<ScriptedImm>, text: &str) {
    ime.backend().set_string(GcsIndex::CompStr, text);
    ime.backend()
        .set_number(GcsIndex::CursorPos, text.encode_utf16().count() as i32);
    let lparam = (GcsIndex::CompStr.bit() | GcsIndex::CursorPos.bit()) as isize;
    dispatch(ime, WM_IME_COMPOSITION, lparam);
}

fn commit(ime: &mut WindowsIme<ScriptedImm>, text: &str) {
    ime.backend().clear_strings();
    ime.backend().set_string(GcsIndex::ResultStr, text);
    dispatch(ime, WM_IME_COMPOSITION, GcsIndex::ResultStr.bit() as isize);
}

#[test]
fn test_poller_reads_coalesced_session() {
    let mut ime = WindowsIme::new(ScriptedImm::new(), HWND, &ImeConfig::default()).unwrap();
    let mut poller = ime.poller();

    // Not composing yet: messages go to the default window procedure
    assert!(!dispatch(&mut ime, WM_IME_STARTCOMPOSITION, 0));

    poller.set_composing(true);
    assert!(dispatch(&mut ime, WM_IME_STARTCOMPOSITION, 0));
    type_composition(&mut ime, "に");
    type_composition(&mut ime, "にほ");
    type_composition(&mut ime, "にほん");
    commit(&mut ime, "日本");
    dispatch(&mut ime, WM_IME_ENDCOMPOSITION, 0);

    // The result overwrites the open composition entry
    poller.poll();
    assert_eq!(poller.pending(), 2);

    assert!(poller.next());
    assert_eq!(poller.state(), CompositionState::Result);
    assert_eq!(poller.string(), Some("日本"));
    assert_eq!(poller.cursor_position(), 3);

    assert!(poller.next());
    assert_eq!(poller.state(), CompositionState::End);

    assert!(!poller.next());
}

#[test]
fn test_poller_on_another_thread() {
    let config = ImeConfig {
        composing_on_create: true,
        ..ImeConfig::default()
    };
    let mut ime = WindowsIme::new(ScriptedImm::new(), HWND, &config).unwrap();
    let mut poller = ime.poller();

    for word in ["a", "b", "c"] {
        dispatch(&mut ime, WM_IME_STARTCOMPOSITION, 0);
        type_composition(&mut ime, word);
        commit(&mut ime, word);
        dispatch(&mut ime, WM_IME_ENDCOMPOSITION, 0);
    }

    let results = thread::spawn(move || {
        poller.poll();
        let mut results = Vec::new();
        while poller.next() {
            if poller.state() == CompositionState::Result {
                results.push(poller.string().unwrap_or_default().to_string());
            }
        }
        results
    })
    .join()
    .unwrap();

    assert_eq!(results, vec!["a", "b", "c"]);
}

#[test]
fn test_session_teardown() {
    let ime = WindowsIme::new(ScriptedImm::new(), HWND, &ImeConfig::default()).unwrap();
    let poller = ime.poller();
    let queue = ime.queue();
    drop(ime);

    // The consumer side outlives the window without touching the backend
    assert!(queue.is_empty());
    assert!(!poller.is_composing());
}

#[test]
fn test_replay_sample_trace() {
    let content = include_str!("../../tools/traces/pinyin_nihao.json");
    let trace = Trace::from_json_str(content).unwrap();

    let batches = replay(&trace, &ImeConfig::default()).unwrap();
    assert_eq!(batches.len(), 2);

    assert_eq!(batches[0].len(), 1);
    assert_eq!(batches[0][0].text(), Some("ni h"));
    assert_eq!(batches[0][0].cursor_pos, 4);

    // "ni hao" is replaced by the result; the emptied composition is then
    // closed by END
    let states: Vec<_> = batches[1].iter().map(|e| e.state).collect();
    assert_eq!(states, vec![CompositionState::Result, CompositionState::End]);
    assert_eq!(batches[1][0].text(), Some("你好"));
    assert_eq!(batches[1][0].cursor_pos, 6);
    assert_eq!(batches[1][1].text(), Some(""));
    assert_eq!(batches[1][1].cursor_pos, 0);
}
