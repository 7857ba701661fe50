//! 点击队列入队与管道吞吐基准测试

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use clicklinker::analytics::{
    ClickEvent, ClickPipeline, ClickPipelineConfig, OverflowPolicy, click_channel,
};
use clicklinker::errors::Result;
use clicklinker::storage::{ClickRepository, LinkId};

/// 空仓库，只用于测量管道本身的开销
struct NoopRepo;

#[async_trait]
impl ClickRepository for NoopRepo {
    async fn create_click(&self, _link_id: LinkId, _timestamp: DateTime<Utc>) -> Result<()> {
        Ok(())
    }
}

/// 无消费者时的入队开销（队列满后走丢弃路径）
fn bench_record_drop_policy(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (recorder, _receiver) = click_channel(1024, OverflowPolicy::Drop).unwrap();

    c.bench_function("click_channel/record_drop", |b| {
        b.to_async(&rt)
            .iter(|| async { recorder.record(ClickEvent::new(1, "bench")).await });
    });
}

/// 不同 worker 数下入队并排空 1000 个事件
fn bench_pipeline_drain(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("click_channel/pipeline");

    for workers in [1usize, 4, 8] {
        group.throughput(Throughput::Elements(1000));
        group.bench_with_input(
            BenchmarkId::new("workers", workers),
            &workers,
            |b, &workers| {
                b.to_async(&rt).iter(|| async move {
                    let pipeline = ClickPipeline::start(
                        ClickPipelineConfig {
                            capacity: 256,
                            worker_count: workers,
                            policy: OverflowPolicy::BlockWithTimeout(Duration::from_secs(1)),
                            shutdown_grace: Duration::from_secs(10),
                        },
                        Arc::new(NoopRepo),
                    )
                    .unwrap();

                    let recorder = pipeline.recorder();
                    for i in 0..1000u64 {
                        recorder.record(ClickEvent::new(i, "bench")).await;
                    }
                    pipeline.shutdown().await
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_record_drop_policy, bench_pipeline_drain);
criterion_main!(benches);
