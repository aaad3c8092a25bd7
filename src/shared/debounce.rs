use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time;

/// 末尾優先のデバウンサ。入力が `delay` の間静止したときだけ
/// 最後の値を出力チャネルへ流す。途中の値は捨てる。
///
/// Debouncer を drop すると保留中の値ごとワーカーが止まるので、
/// 破棄後に値が漏れることはない。
#[derive(Debug)]
pub struct Debouncer<T> {
    input: mpsc::UnboundedSender<T>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new(delay: Duration) -> (Self, mpsc::UnboundedReceiver<T>) {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (output_tx, output_rx) = mpsc::unbounded_channel();
        tokio::spawn(run(input_rx, output_tx, delay));
        (Self { input: input_tx }, output_rx)
    }

    /// 最新値を投入する。静止期間のタイマーはここから数え直す。
    pub fn push(&self, value: T) {
        let _ = self.input.send(value);
    }
}

async fn run<T>(
    mut input: mpsc::UnboundedReceiver<T>,
    output: mpsc::UnboundedSender<T>,
    delay: Duration,
) {
    let mut pending: Option<T> = None;
    loop {
        match pending.take() {
            Some(value) => {
                let timer = time::sleep(delay);
                tokio::pin!(timer);
                tokio::select! {
                    next = input.recv() => match next {
                        // 静止期間内の更新はタイマーを仕切り直す
                        Some(next) => pending = Some(next),
                        None => return,
                    },
                    _ = &mut timer => {
                        if output.send(value).is_err() {
                            return;
                        }
                    }
                }
            }
            None => match input.recv().await {
                Some(value) => pending = Some(value),
                None => return,
            },
        }
    }
}
