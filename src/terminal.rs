use core::fmt::Write;

use defmt::*;
use rtic::Mutex;
use rtic_monotonics::{
    stm32::{Tim2 as Mono, *},
    Monotonic,
};
use trackpad_thermal::{
    line::{is_whitespace, LineBuffer},
    report::{write_record, write_status, write_temp},
};

use crate::{app::terminal::Context, regulator_task::REGULATION_PERIOD_SECS};

pub const BUFFER_SIZE: usize = 32;

pub type Buffer = LineBuffer<BUFFER_SIZE>;

const HELP_STR: &str = "Commands:\r
    help\r
    status\r
    config\r
    watch\r
    dump\r
    reset\r
";

/// Terminal handler
///
/// Commands:
/// - `help` - Print help
/// - `status` - Print the last regulation cycle
/// - `config` - Print the trip and re-arm temperatures
/// - `watch` - Print every regulation cycle until `s` is pressed
/// - `dump` - Dump the status history
/// - `reset` - Reset the MCU
#[cfg_attr(feature = "sizing", inline(never))]
pub async fn terminal(mut cx: Context<'_>) {
    loop {
        let Some(line) = cx.shared.buffer.lock(Buffer::take_line) else {
            return;
        };

        // Split line into arguments
        let mut args = line.split(|b| is_whitespace(*b));

        match args.next() {
            None | Some(&[]) => trace!("Empty command"),
            Some(b"help") => print_uart(&mut cx, HELP_STR),
            Some(b"status") => {
                let status = cx.shared.status.lock(|s| *s);
                cx.shared
                    .usart
                    .lock(|tx| check(write_status(tx, &status)));
            }
            Some(b"config") => {
                let config = *cx.shared.config;
                cx.shared.usart.lock(|tx| {
                    print_uart_locked(tx, "max ");
                    check(write_temp(tx, config.max_temp()));
                    print_uart_locked(tx, " rearm ");
                    check(write_temp(tx, config.rearm_temp()));
                    print_uart_locked(tx, "\r\n");
                });
            }
            Some(b"watch") => watch_status(&mut cx).await,
            Some(b"dump") => {
                let (usart, storage) = (&mut cx.shared.usart, &mut cx.shared.storage);
                (usart, storage).lock(|tx, storage| {
                    for record in storage.oldest() {
                        check(write_record(tx, &record));
                    }
                });
            }
            Some(b"reset") => {
                print_uart(&mut cx, "Resetting...\r\n");
                cortex_m::peripheral::SCB::sys_reset();
            }
            Some(b) => {
                print_uart(&mut cx, "Unknown command: '");
                // SAFETY: b may not be valid UTF-8, but we don't care cause we're just printing it
                // Also, including UTF8 checks would add a lot to the binary size
                print_uart(&mut cx, unsafe { core::str::from_utf8_unchecked(b) });
                print_uart(&mut cx, "'\r\n");
            }
        }
    }
}

fn print_uart(cx: &mut Context, str: &str) {
    cx.shared.usart.lock(|tx| print_uart_locked(tx, str));
}

fn print_uart_locked<W: Write>(tx: &mut W, str: &str) {
    check(tx.write_str(str));
}

/// Logs a failed UART write and carries on
fn check(res: core::fmt::Result) {
    if res.is_err() {
        warn!("Failed to write to UART");
    }
}

/// Print each new regulation cycle until 's' is pressed
async fn watch_status(cx: &mut Context<'_>) {
    print_uart(cx, "Press 's' to stop watching\r\n");
    let mut seen = cx.shared.status.lock(|s| s.cycle());

    loop {
        Mono::delay(REGULATION_PERIOD_SECS.secs()).await;

        let status = cx.shared.status.lock(|s| *s);
        if status.cycle() != seen {
            seen = status.cycle();
            cx.shared
                .usart
                .lock(|tx| check(write_status(tx, &status)));
        }

        // Check if 's' is in the buffer and stop if it is
        // Also, clear the buffer to prevent it from overflowing
        let to_break = cx.shared.buffer.lock(|buffer| {
            let to_break = buffer.contains(b's');

            // Clear buffer
            buffer.clear();

            to_break
        });
        if to_break {
            break;
        }
    }
}
