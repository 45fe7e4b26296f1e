fn main() {
    chargesheet_lib::run()
}
