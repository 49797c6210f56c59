#![no_std]
#![no_main]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(dead_code, clippy::module_name_repetitions, clippy::wildcard_imports)]

mod regulator_task;
mod terminal;

use defmt_rtt as _;
use panic_probe as _;

const SENSOR_ADDR: trackpad_thermal::thermometer::tmp102::Address =
    trackpad_thermal::thermometer::tmp102::Address::Gnd;

#[rtic::app(device = stm32f0xx_hal::pac, dispatchers = [USART1, TIM14])]
mod app {
    use defmt::{panic, unreachable, *};
    use rtic_monotonics::{
        stm32::{Tim2 as Mono, *},
        Monotonic,
    };
    use rtic_sync::{
        channel::{ReceiveError, Receiver, Sender},
        make_channel,
    };
    use stm32f0xx_hal::{
        gpio::{
            gpioa::{PA15, PA2, PA8},
            gpiob::{PB6, PB7},
            Alternate, Input, Output, Pin, PullUp, PushPull, AF1,
        },
        i2c::I2c,
        pac::{Interrupt, I2C1, IWDG, USART2},
        prelude::*,
        serial,
        serial::{Event, Serial},
        watchdog::Watchdog,
    };
    use trackpad_thermal::{
        line::is_newline,
        storage::Storage,
        thermometer::tmp102::Tmp102,
        ControllerConfig, ControllerStatus, PinCooler, ThermalController,
    };

    use crate::{
        regulator_task::{HYSTERESIS, MAX_TEMP},
        terminal::Buffer,
        SENSOR_ADDR,
    };

    type Sensor = Tmp102<I2c<I2C1, PB6<Alternate<AF1>>, PB7<Alternate<AF1>>>, PA8<Input<PullUp>>>;
    type Peltier = PinCooler<Pin<Output<PushPull>>>;

    #[shared]
    struct Shared {
        usart: Serial<USART2, PA2<Alternate<AF1>>, PA15<Alternate<AF1>>>,
        buffer: Buffer,
        status: ControllerStatus,
        config: ControllerConfig,
        storage: Storage<100>,
    }

    #[local]
    struct Local {
        controller: ThermalController<Sensor, Peltier>,
        tx: Sender<'static, (u32, ControllerStatus), 4>,
    }

    #[init]
    fn init(mut cx: init::Context) -> (Shared, Local) {
        // Set system clock to 24 MHz
        let mut rcc = cx
            .device
            .RCC
            .configure()
            .hsi48()
            .sysclk(24.mhz())
            .pclk(24.mhz())
            .hclk(24.mhz())
            .freeze(&mut cx.device.FLASH);

        trace!("sysclk: {}", rcc.clocks.sysclk().0);
        trace!("hclk: {}", rcc.clocks.hclk().0);
        trace!("pclk: {}", rcc.clocks.pclk().0);

        // Enable tim2 monotonic
        let token = rtic_monotonics::create_stm32_tim2_monotonic_token!();
        Mono::start(24_000_000, token);

        // Refuse to regulate with undefined thresholds
        let config = match ControllerConfig::new(MAX_TEMP, HYSTERESIS) {
            Ok(config) => config,
            Err(e) => panic!("Invalid configuration: {}", e),
        };
        info!("Regulating with {}", config);

        // Setup GPIO
        let gpioa = cx.device.GPIOA.split(&mut rcc);
        let gpiob = cx.device.GPIOB.split(&mut rcc);

        // Setup the Peltier first so it is held off while everything else comes up
        let peltier = unwrap!(PinCooler::new(
            gpiob.pb4.into_push_pull_output(&cx.cs).downgrade()
        ));

        let _ = watchdog::spawn(cx.device.IWDG);

        // Setup USART & USART interrupt
        let mut usart = Serial::usart2(
            cx.device.USART2,
            (
                gpioa.pa2.into_alternate_af1(&cx.cs),
                gpioa.pa15.into_alternate_af1(&cx.cs),
            ),
            115_200.bps(),
            &mut rcc,
        );
        usart.listen(Event::Rxne);
        rtic::pend(Interrupt::USART2);

        // Setup TMP102
        let i2c = I2c::i2c1(
            cx.device.I2C1,
            (
                gpiob.pb6.into_alternate_af1(&cx.cs),
                gpiob.pb7.into_alternate_af1(&cx.cs),
            ),
            100.khz(),
            &mut rcc,
        );
        let alert = gpioa.pa8.into_pull_up_input(&cx.cs);
        let mut sensor = Tmp102::new(i2c, SENSOR_ADDR, Some(alert));

        // The TMP102 keeps its configuration across an MCU reset, so make sure it converts
        if let Err(e) = sensor.shutdown(false) {
            warn!("Failed to wake TMP102: {}", e.as_str());
        }

        // The loop doesn't depend on ALERT, so a failure here is only worth a warning
        if let Err(e) = sensor.configure_alert(&config) {
            warn!("Failed to program TMP102 alert: {}", e.as_str());
        }

        let controller = ThermalController::new(sensor, peltier, config);
        let status = controller.status();

        // Setup channels
        let (tx, rx) = make_channel!((u32, ControllerStatus), 4);

        // Launch regulation & history
        let _ = regulator::spawn();
        let _ = storage::spawn(rx);

        (
            Shared {
                usart,
                buffer: Buffer::new(),
                status,
                config,
                storage: Storage::new(),
            },
            Local { controller, tx },
        )
    }

    #[idle]
    fn idle(_: idle::Context) -> ! {
        rtic::pend(Interrupt::USART2);

        loop {
            cortex_m::asm::wfi();
        }
    }

    #[task(priority = 1)]
    async fn watchdog(_: watchdog::Context, wdg: IWDG) {
        let mut wdg = Watchdog::new(wdg);
        wdg.start(1.hz());

        loop {
            wdg.feed();
            Mono::delay(100.millis()).await;
        }
    }

    #[task(priority = 2, local = [controller, tx], shared = [status])]
    async fn regulator(cx: regulator::Context) {
        crate::regulator_task::regulator(cx).await;
    }

    #[task(priority = 1, shared = [storage])]
    async fn storage(
        mut cx: storage::Context,
        mut rx: Receiver<'static, (u32, ControllerStatus), 4>,
    ) {
        loop {
            let (secs, status) = match rx.recv().await {
                Ok(record) => record,
                Err(ReceiveError::Empty) => continue,
                Err(ReceiveError::NoSender) => unreachable!("Sender dropped"),
            };

            cx.shared.storage.lock(|storage| {
                storage.write(secs, &status);
            });
        }
    }

    #[task(priority = 1, shared = [usart, buffer, status, &config, storage])]
    async fn terminal(cx: terminal::Context) {
        crate::terminal::terminal(cx).await;
    }

    #[task(binds = USART2, local = [times: u32 = 0], shared = [usart, buffer])]
    fn usart2(cx: usart2::Context) {
        *cx.local.times += 1;

        // Read & echo all available bytes from the usart
        (cx.shared.usart, cx.shared.buffer).lock(|usart, buffer| loop {
            match usart.read() {
                Ok(b) => {
                    // Echo back
                    if is_newline(b) {
                        let _ = nb::block!(usart.write(b'\r'));
                        let _ = nb::block!(usart.write(b'\n'));
                    } else {
                        let _ = nb::block!(usart.write(b));
                    }

                    // Append to buffer, dropping the line if it got too long
                    if buffer.push(b).is_err() {
                        warn!("Terminal line too long, discarded");
                    }
                }
                Err(nb::Error::WouldBlock) => break,
                // Reading cleared the error flag; the byte is lost but the terminal goes on
                Err(nb::Error::Other(serial::Error::Framing)) => warn!("USART error: Framing"),
                Err(nb::Error::Other(serial::Error::Noise)) => warn!("USART error: Noise"),
                Err(nb::Error::Other(serial::Error::Overrun)) => warn!("USART error: Overrun"),
                Err(nb::Error::Other(serial::Error::Parity)) => warn!("USART error: Parity"),
                Err(nb::Error::Other(_)) => warn!("USART error: Unknown"),
            }
        });

        defmt::trace!("USART2 interrupt fired: {}", *cx.local.times);

        // Trigger terminal task to handle input
        let _ = terminal::spawn();
    }

    timestamp!("{=u64:us}", {
        Mono::now().duration_since_epoch().to_micros()
    });
}
