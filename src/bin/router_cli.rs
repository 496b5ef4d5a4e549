use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use weatherrouting::isochrone::ValidityFilters;
use weatherrouting::polar::Polar;
use weatherrouting::router::PolarRouter;
use weatherrouting::wind::UniformWindOracle;
use weatherrouting::RoutingDriver;

fn main() {
    env_logger::init();
    println!("--- Weather Routing CLI Debugger ---");

    let start = (48.0, -5.0); // off the coast of Brittany
    let destination = (40.0, -10.0); // towards the Azores
    let track = vec![start, destination];

    println!("Loading polar...");
    let polar = match Polar::load("data/bavaria38.pol") {
        Ok(p) => Arc::new(p),
        Err(e) => {
            eprintln!("could not load data/bavaria38.pol ({e}), using a built-in demo polar");
            Arc::new(demo_polar())
        }
    };

    // Uniform 20kt wind from the north.
    let wind = UniformWindOracle::new(0.0, 20.0 / weatherrouting::geomath::MS_TO_KT);
    let filters = ValidityFilters::default();
    let router = Box::new(PolarRouter::new(polar));

    let mut driver = RoutingDriver::new(router, track, &wind, Utc::now(), None, filters);

    let mut step = 0;
    while !driver.end() && step < 200 {
        step += 1;
        let start_time = Instant::now();
        let result = driver.step(1.0).expect("routing step failed");
        let elapsed = start_time.elapsed();

        println!("\n--- Step {step} ---");
        println!("Progress: {:.1}%", result.progress);
        println!("Position: {:.4}, {:.4}", result.position.0, result.position.1);
        println!("Calculation time: {elapsed:?}");
    }

    println!("\nRouting finished after {} steps, {} path points.", driver.steps(), driver.path().len());
}

fn demo_polar() -> Polar {
    let text = "TWA\\TWS\t6\t8\t10\t12\t14\t16\t20\n\
                 0\t0.0\t0.0\t0.0\t0.0\t0.0\t0.0\t0.0\n\
                 52\t4.8\t5.6\t6.1\t6.4\t6.6\t6.7\t6.8\n\
                 60\t5.2\t6.1\t6.8\t7.2\t7.4\t7.5\t7.6\n\
                 75\t5.2\t6.2\t7.0\t7.5\t7.8\t8.0\t8.2\n\
                 90\t5.0\t6.0\t6.9\t7.5\t7.9\t8.2\t8.6\n\
                 110\t4.6\t5.6\t6.6\t7.3\t7.9\t8.3\t9.0\n\
                 120\t4.0\t5.2\t6.2\t7.0\t7.6\t8.1\t8.9\n\
                 135\t3.3\t4.4\t5.3\t6.1\t6.8\t7.4\t8.3\n\
                 150\t2.8\t3.8\t4.6\t5.3\t5.9\t6.5\t7.4\n\
                 170\t1.0\t1.1\t1.3\t1.5\t1.7\t1.9\t2.2\n\
                 180\t0.9\t1.0\t1.2\t1.4\t1.6\t1.8\t2.1\n";
    Polar::from_str(text).expect("built-in demo polar is well-formed")
}
