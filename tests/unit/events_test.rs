//! Tests for dispatch events and sinks

use std::sync::Arc;

use slot_dispatch::core::{
    ConsoleEventSink, DispatchEvent, EventSink, FanoutEventSink, InMemoryEventSink,
    TracingEventSink,
};

#[test]
fn test_console_lines() {
    let cases = [
        (DispatchEvent::Startup { parallelism: 8 }, "Processor Amount: 8"),
        (
            DispatchEvent::Completed {
                identity: 3,
                resource: 1,
                message: "Task #3 is using resource #1".into(),
            },
            "Task #3 is using resource #1",
        ),
        (
            DispatchEvent::Faulted {
                identity: 4,
                error: "boom".into(),
            },
            "Task#4 has an error. Error => boom",
        ),
        (
            DispatchEvent::Contention {
                identity: 5,
                resource: 1,
            },
            "Task #5 CANNOT access resource #1",
        ),
        (
            DispatchEvent::Interrupted {
                identity: 6,
                message: "The operation was canceled.".into(),
            },
            "Killing task #6. The operation was canceled.",
        ),
    ];
    for (event, line) in cases {
        assert_eq!(event.to_string(), line);
    }
}

#[test]
fn test_instrumentation_events() {
    let claimed = DispatchEvent::Claimed {
        identity: 1,
        resource: 1,
    };
    let released = DispatchEvent::Released {
        identity: 1,
        resource: 1,
    };
    assert!(claimed.is_instrumentation());
    assert!(released.is_instrumentation());
    assert!(!DispatchEvent::Stopped { last_identity: 1 }.is_instrumentation());
    assert_eq!(claimed.identity(), Some(1));
    assert_eq!(DispatchEvent::Startup { parallelism: 1 }.identity(), None);
}

#[test]
fn test_in_memory_sink() {
    let sink = InMemoryEventSink::new(10);
    sink.record(&DispatchEvent::Startup { parallelism: 2 });
    sink.record(&DispatchEvent::Contention {
        identity: 1,
        resource: 1,
    });

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0], DispatchEvent::Startup { parallelism: 2 });
    assert_eq!(sink.lines()[1], "Task #1 CANNOT access resource #1");
}

#[test]
fn test_in_memory_sink_overflow() {
    let sink = InMemoryEventSink::new(2);

    for identity in 1..=3 {
        sink.record(&DispatchEvent::Contention {
            identity,
            resource: 0,
        });
    }

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].identity(), Some(2)); // First one popped
    assert_eq!(events[1].identity(), Some(3));
}

#[test]
fn test_fanout_reaches_every_sink() {
    let first = InMemoryEventSink::new(4);
    let second = InMemoryEventSink::new(4);
    let fanout = FanoutEventSink::new()
        .with(Arc::new(first.clone()))
        .with(Arc::new(second.clone()))
        .with(Arc::new(TracingEventSink))
        .with(Arc::new(ConsoleEventSink::new()));

    fanout.record(&DispatchEvent::Stopped { last_identity: 12 });

    assert_eq!(first.lines(), vec!["Dispatch stopped after task #12"]);
    assert_eq!(second.events(), first.events());
}

#[test]
fn test_console_sink_leaves_fatal_to_caller() {
    let console = ConsoleEventSink::new();
    let fatal = DispatchEvent::Fatal {
        report: "Error #1 => concurrency gate closed".into(),
    };
    let claimed = DispatchEvent::Claimed {
        identity: 1,
        resource: 1,
    };

    assert!(!console.accepts(&fatal));
    assert!(!console.accepts(&claimed));
    assert!(console.accepts(&DispatchEvent::Startup { parallelism: 2 }));

    let verbose = ConsoleEventSink::new().with_instrumentation(true);
    assert!(verbose.accepts(&claimed));
    assert!(!verbose.accepts(&fatal));
}
