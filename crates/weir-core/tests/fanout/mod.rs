//! 扇出路由器的隔离性质：修改型分支的写入不会被任何其他分支观察到。

use proptest::prelude::*;
use weir_core::test_stubs::{RECORDER_MARK_KEY, RecordingConsumer};
use weir_core::{
    Batch, CallContext, Capabilities, ConsumerHandle, FanOut, TracesData, WeirError, consumer_fn,
};

fn is_stamped(batch: &Batch<TracesData>) -> bool {
    batch.read(|data| {
        data.spans
            .iter()
            .any(|span| span.attributes.contains_key(RECORDER_MARK_KEY))
    })
}

fn failing(capabilities: Capabilities, code: &'static str) -> ConsumerHandle<TracesData> {
    consumer_fn(capabilities, move |_, _| {
        Err(WeirError::downstream(code, "rejected"))
    })
}

#[test]
fn mutator_stamp_is_invisible_to_reader() {
    let reader = RecordingConsumer::<TracesData>::new("a");
    let writer = RecordingConsumer::<TracesData>::mutating("b");
    let routed = FanOut::build([reader.handle(), writer.handle()]).expect("构造成功");

    let batch = Batch::<TracesData>::synthesize(10);
    routed
        .consume(&CallContext::default(), batch.clone())
        .expect("分发成功");

    let seen_by_reader = &reader.batches()[0];
    let seen_by_writer = &writer.batches()[0];
    assert!(Batch::same_instance(seen_by_reader, &batch), "只读分支共享原实例");
    assert!(!Batch::same_instance(seen_by_writer, &batch), "修改型分支拿到深拷贝");
    assert!(is_stamped(seen_by_writer));
    assert!(!is_stamped(seen_by_reader), "A 不应看到 B 的写入");
    assert_eq!(seen_by_reader.item_count(), 10);
}

#[test]
fn several_readers_share_a_read_only_instance() {
    let first = RecordingConsumer::<TracesData>::new("r1");
    let second = RecordingConsumer::<TracesData>::new("r2");
    let routed = FanOut::build([first.handle(), second.handle()]).expect("构造成功");

    let batch = Batch::<TracesData>::synthesize(1);
    routed
        .consume(&CallContext::default(), batch.clone())
        .expect("分发成功");

    assert!(batch.is_read_only(), "两个以上读者共享时必须标记只读");
    assert!(Batch::same_instance(&first.batches()[0], &second.batches()[0]));
    let err = batch
        .mutate(|data| data.spans.clear())
        .expect_err("只读批次拒绝修改");
    assert!(matches!(err, WeirError::ReadOnlyBatch { .. }));
}

#[test]
fn read_only_input_is_never_handed_to_a_mutator() {
    let first = RecordingConsumer::<TracesData>::mutating("m1");
    let second = RecordingConsumer::<TracesData>::mutating("m2");
    let routed = FanOut::build([first.handle(), second.handle()]).expect("构造成功");

    let batch = Batch::<TracesData>::synthesize(2);
    batch.mark_read_only();
    routed
        .consume(&CallContext::default(), batch.clone())
        .expect("深拷贝可以修改");

    for recorder in [&first, &second] {
        let received = &recorder.batches()[0];
        assert!(!Batch::same_instance(received, &batch));
        assert!(is_stamped(received));
    }
    assert!(!is_stamped(&batch));
}

#[test]
fn errors_follow_invocation_order() {
    let reader_ok = RecordingConsumer::<TracesData>::new("ok");
    let routed = FanOut::build([
        failing(Capabilities::READ_ONLY, "reader.first"),
        failing(Capabilities::MUTATES, "mutator"),
        reader_ok.handle(),
        failing(Capabilities::READ_ONLY, "reader.second"),
    ])
    .expect("构造成功");

    let err = routed
        .consume(&CallContext::default(), Batch::synthesize(1))
        .expect_err("三个分支失败");
    let WeirError::FanOut(aggregate) = err else {
        panic!("期望聚合错误");
    };
    let codes: Vec<_> = aggregate.errors().iter().map(WeirError::code).collect();
    assert_eq!(codes, vec!["mutator", "reader.first", "reader.second"]);
    assert_eq!(reader_ok.count(), 1, "失败不影响其余分支被调用");
}

#[test]
fn single_failure_is_not_wrapped() {
    let reader = RecordingConsumer::<TracesData>::new("ok");
    let routed = FanOut::build([reader.handle(), failing(Capabilities::READ_ONLY, "lonely")])
        .expect("构造成功");

    let err = routed
        .consume(&CallContext::default(), Batch::synthesize(1))
        .expect_err("一个分支失败");
    assert!(matches!(err, WeirError::Downstream(_)));
    assert_eq!(err.code(), "lonely");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// 任意修改型/只读组合下，修改型分支拿到的实例都不与其他分支共享，读者看不到任何写入。
    #[test]
    fn mutators_never_alias_another_branch(
        shape in prop::collection::vec(any::<bool>(), 1..8),
        items in 1usize..6,
        pre_marked in any::<bool>(),
    ) {
        let recorders: Vec<_> = shape
            .iter()
            .enumerate()
            .map(|(index, mutates)| {
                let label = format!("branch-{index}");
                if *mutates {
                    RecordingConsumer::<TracesData>::mutating(label)
                } else {
                    RecordingConsumer::<TracesData>::new(label)
                }
            })
            .collect();
        let routed = FanOut::build(recorders.iter().map(RecordingConsumer::handle))
            .expect("非空集合合法");

        let batch = Batch::<TracesData>::synthesize(items);
        // 单个消费者不经路由直接拿到原实例，预先只读只对真正的扇出有意义。
        if pre_marked && shape.len() > 1 {
            batch.mark_read_only();
        }
        routed
            .consume(&CallContext::default(), batch.clone())
            .expect("深拷贝之外不会遇到只读拒绝");

        let received: Vec<(bool, Batch<TracesData>)> = shape
            .iter()
            .zip(&recorders)
            .map(|(mutates, recorder)| {
                prop_assert_eq!(recorder.count(), 1);
                Ok((*mutates, recorder.batches().remove(0)))
            })
            .collect::<Result<_, TestCaseError>>()?;

        for (index, (mutates, batch_seen)) in received.iter().enumerate() {
            prop_assert_eq!(batch_seen.item_count(), items);
            if *mutates {
                for (other, (_, other_seen)) in received.iter().enumerate() {
                    if other != index {
                        prop_assert!(!Batch::same_instance(batch_seen, other_seen));
                    }
                }
            } else {
                prop_assert!(Batch::same_instance(batch_seen, &batch));
                prop_assert!(!is_stamped(batch_seen));
            }
        }

        let readers = shape.iter().filter(|mutates| !**mutates).count();
        if readers > 1 {
            prop_assert!(batch.is_read_only());
        }
    }
}
